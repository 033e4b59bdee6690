//! Bank Issuance Proxy
//!
//! Thin pass-through to the partner bank's card issuance endpoint. The
//! gateway adds nothing to the exchange; it only spares the mobile client
//! a second origin. With no endpoint configured the route reports the
//! integration as unavailable instead of failing requests downstream.

pub mod handlers;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned by the bank for an accepted issuance request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuanceResponse {
    pub token: String,
}

pub struct BankClient {
    http: reqwest::Client,
    issuance_url: Option<String>,
}

impl BankClient {
    pub fn new(issuance_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            issuance_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.issuance_url.is_some()
    }

    /// Forward an issuance request to the configured bank endpoint.
    pub async fn request_issuance(&self) -> Result<IssuanceResponse> {
        let url = self
            .issuance_url
            .as_deref()
            .context("bank issuance URL not configured")?;

        let response = self
            .http
            .post(url)
            .send()
            .await
            .context("bank request failed")?
            .error_for_status()
            .context("bank returned an error status")?;

        response
            .json::<IssuanceResponse>()
            .await
            .context("bank returned a malformed body")
    }
}

/// Local stand-in for the partner bank, mounted under /internal/mock when
/// the `mock-api` feature is on. Lets the full issuance flow run in dev
/// environments without bank connectivity.
#[cfg(feature = "mock-api")]
pub async fn mock_bank_issuance() -> axum::Json<IssuanceResponse> {
    axum::Json(IssuanceResponse {
        token: uuid::Uuid::new_v4().to_string(),
    })
}
