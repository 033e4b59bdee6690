//! PostgreSQL Ledger Store
//!
//! Durable implementation of [`LedgerStore`]. Every multi-row operation runs
//! inside a single database transaction: row locks (`FOR UPDATE`) serialize
//! writers per wallet, and the redeem compare-and-set on
//! `redeemed_at IS NULL` picks exactly one winner per token. An early
//! `return Err(..)` drops the transaction, which rolls back all writes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::error::LedgerError;
use super::models::{Token, TransferRecord, Wallet};
use super::store::LedgerStore;

pub struct PgLedgerStore {
    pool: PgPool,
}

const TOKEN_COLUMNS: &str =
    "token_id, issuer_user_id, amount, pin_hash, created_at, redeemed_at, redeemed_by";

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the wallet row if missing. Idempotent, takes no lock on an
    /// existing row.
    async fn ensure_wallet_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO wallets_tb (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Lock wallet rows in ascending user id order so concurrent
    /// settlements touching the same pair cannot deadlock.
    async fn lock_wallets_tx(
        tx: &mut Transaction<'_, Postgres>,
        mut user_ids: Vec<i64>,
    ) -> Result<(), sqlx::Error> {
        user_ids.sort_unstable();
        user_ids.dedup();
        sqlx::query("SELECT user_id FROM wallets_tb WHERE user_id = ANY($1) ORDER BY user_id FOR UPDATE")
            .bind(&user_ids)
            .fetch_all(&mut **tx)
            .await?;
        Ok(())
    }

    fn wallet_from_row(row: &PgRow) -> Result<Wallet, sqlx::Error> {
        Ok(Wallet {
            user_id: row.try_get("user_id")?,
            available: row.try_get("available")?,
            reserved: row.try_get("reserved")?,
        })
    }

    fn token_from_row(row: &PgRow) -> Result<Token, LedgerError> {
        let raw_id: String = row.try_get("token_id")?;
        let token_id = Uuid::parse_str(&raw_id).map_err(|e| {
            LedgerError::DatabaseError(format!("malformed token id '{}': {}", raw_id, e))
        })?;
        Ok(Token {
            token_id,
            issuer_user_id: row.try_get("issuer_user_id")?,
            amount: row.try_get("amount")?,
            pin_hash: row.try_get("pin_hash")?,
            created_at: row.try_get("created_at")?,
            redeemed_at: row.try_get("redeemed_at")?,
            redeemed_by: row.try_get("redeemed_by")?,
        })
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError> {
        sqlx::query("INSERT INTO wallets_tb (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT user_id, available, reserved FROM wallets_tb WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Self::wallet_from_row(&row)?)
    }

    async fn get_token(&self, token_id: Uuid) -> Result<Token, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tokens_tb WHERE token_id = $1",
            TOKEN_COLUMNS
        ))
        .bind(token_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LedgerError::NotFound("Token"))?;

        Self::token_from_row(&row)
    }

    async fn apply_wallet_delta(
        &self,
        user_id: i64,
        available_delta: Decimal,
        reserved_delta: Decimal,
    ) -> Result<Wallet, LedgerError> {
        let mut tx = self.pool.begin().await?;

        Self::ensure_wallet_tx(&mut tx, user_id).await?;

        // Lock the row for the read-check-write cycle
        let row = sqlx::query("SELECT available, reserved FROM wallets_tb WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let available: Decimal = row.try_get("available")?;
        let reserved: Decimal = row.try_get("reserved")?;

        let new_available = available + available_delta;
        let new_reserved = reserved + reserved_delta;
        if new_available < Decimal::ZERO || new_reserved < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }

        sqlx::query(
            "UPDATE wallets_tb SET available = $1, reserved = $2, updated_at = NOW()
             WHERE user_id = $3",
        )
        .bind(new_available)
        .bind(new_reserved)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Wallet {
            user_id,
            available: new_available,
            reserved: new_reserved,
        })
    }

    async fn create_token(&self, token: &Token) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO tokens_tb (token_id, issuer_user_id, amount, pin_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.token_id.to_string())
        .bind(token.issuer_user_id)
        .bind(token.amount)
        .bind(&token.pin_hash)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => LedgerError::Conflict,
            _ => LedgerError::from(e),
        })?;

        Ok(())
    }

    async fn mark_redeemed(
        &self,
        token_id: Uuid,
        redeemed_by: i64,
    ) -> Result<Token, LedgerError> {
        // Single-statement compare-and-set: the WHERE clause only matches an
        // outstanding token, so exactly one concurrent caller flips it.
        let updated = sqlx::query(&format!(
            "UPDATE tokens_tb SET redeemed_at = NOW(), redeemed_by = $2
             WHERE token_id = $1 AND redeemed_at IS NULL
             RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(token_id.to_string())
        .bind(redeemed_by)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Self::token_from_row(&row),
            None => {
                let exists =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tokens_tb WHERE token_id = $1")
                        .bind(token_id.to_string())
                        .fetch_one(&self.pool)
                        .await?;
                if exists > 0 {
                    Err(LedgerError::AlreadyRedeemed)
                } else {
                    Err(LedgerError::NotFound("Token"))
                }
            }
        }
    }

    async fn list_tokens(&self, issuer_user_id: i64) -> Result<Vec<Token>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tokens_tb WHERE issuer_user_id = $1 ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))
        .bind(issuer_user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::token_from_row).collect()
    }

    async fn reserve_token(&self, token: &Token) -> Result<Wallet, LedgerError> {
        let mut tx = self.pool.begin().await?;

        Self::ensure_wallet_tx(&mut tx, token.issuer_user_id).await?;

        // Lock issuer wallet for the funds check
        let row = sqlx::query("SELECT available, reserved FROM wallets_tb WHERE user_id = $1 FOR UPDATE")
            .bind(token.issuer_user_id)
            .fetch_one(&mut *tx)
            .await?;

        let available: Decimal = row.try_get("available")?;
        let reserved: Decimal = row.try_get("reserved")?;

        if available < token.amount {
            return Err(LedgerError::InsufficientFunds);
        }

        sqlx::query(
            "UPDATE wallets_tb SET available = available - $1, reserved = reserved + $1,
             updated_at = NOW() WHERE user_id = $2",
        )
        .bind(token.amount)
        .bind(token.issuer_user_id)
        .execute(&mut *tx)
        .await?;

        // Id collision aborts the whole unit; the balance move above rolls
        // back with the transaction.
        sqlx::query(
            "INSERT INTO tokens_tb (token_id, issuer_user_id, amount, pin_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.token_id.to_string())
        .bind(token.issuer_user_id)
        .bind(token.amount)
        .bind(&token.pin_hash)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => LedgerError::Conflict,
            _ => LedgerError::from(e),
        })?;

        tx.commit().await?;

        Ok(Wallet {
            user_id: token.issuer_user_id,
            available: available - token.amount,
            reserved: reserved + token.amount,
        })
    }

    async fn redeem_token(
        &self,
        token_id: Uuid,
        claimant_user_id: i64,
    ) -> Result<Token, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set first: whoever flips redeemed_at owns the
        // settlement, everyone else unblocks into the None branch.
        let updated = sqlx::query(&format!(
            "UPDATE tokens_tb SET redeemed_at = NOW(), redeemed_by = $2
             WHERE token_id = $1 AND redeemed_at IS NULL
             RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(token_id.to_string())
        .bind(claimant_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tokens_tb WHERE token_id = $1")
                    .bind(token_id.to_string())
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists > 0 {
                LedgerError::AlreadyRedeemed
            } else {
                LedgerError::NotFound("Token")
            });
        };
        let token = Self::token_from_row(&row)?;

        Self::ensure_wallet_tx(&mut tx, claimant_user_id).await?;
        Self::lock_wallets_tx(&mut tx, vec![token.issuer_user_id, claimant_user_id]).await?;

        // Release the issuer's reservation. Outstanding tokens are always
        // covered by reserved funds; a miss here means the ledger is
        // corrupt and the settlement must not proceed.
        let released = sqlx::query(
            "UPDATE wallets_tb SET reserved = reserved - $1, updated_at = NOW()
             WHERE user_id = $2 AND reserved >= $1",
        )
        .bind(token.amount)
        .bind(token.issuer_user_id)
        .execute(&mut *tx)
        .await?;

        if released.rows_affected() == 0 {
            return Err(LedgerError::SystemError(format!(
                "reservation underflow for user {}",
                token.issuer_user_id
            )));
        }

        sqlx::query(
            "UPDATE wallets_tb SET available = available + $1, updated_at = NOW()
             WHERE user_id = $2",
        )
        .bind(token.amount)
        .bind(claimant_user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(token)
    }

    async fn transfer(
        &self,
        from_user: i64,
        to_user: i64,
        amount: Decimal,
    ) -> Result<TransferRecord, LedgerError> {
        let mut tx = self.pool.begin().await?;

        Self::ensure_wallet_tx(&mut tx, from_user).await?;

        // Sending to a wallet that has never been touched is almost always
        // a mistyped id; reject instead of conjuring a recipient.
        let recipient =
            sqlx::query_scalar::<_, i64>("SELECT user_id FROM wallets_tb WHERE user_id = $1")
                .bind(to_user)
                .fetch_optional(&mut *tx)
                .await?;
        if recipient.is_none() {
            return Err(LedgerError::NotFound("Recipient wallet"));
        }

        Self::lock_wallets_tx(&mut tx, vec![from_user, to_user]).await?;

        // Guarded debit: the WHERE clause refuses to take available negative
        let debited = sqlx::query(
            "UPDATE wallets_tb SET available = available - $1, updated_at = NOW()
             WHERE user_id = $2 AND available >= $1",
        )
        .bind(amount)
        .bind(from_user)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            return Err(LedgerError::InsufficientFunds);
        }

        sqlx::query(
            "UPDATE wallets_tb SET available = available + $1, updated_at = NOW()
             WHERE user_id = $2",
        )
        .bind(amount)
        .bind(to_user)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            "INSERT INTO transfers_tb (from_user, to_user, amount)
             VALUES ($1, $2, $3)
             RETURNING transfer_id, from_user, to_user, amount, created_at",
        )
        .bind(from_user)
        .bind(to_user)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TransferRecord {
            transfer_id: row.try_get("transfer_id")?,
            from_user: row.try_get("from_user")?,
            to_user: row.try_get("to_user")?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn list_transfers(&self, user_id: i64) -> Result<Vec<TransferRecord>, LedgerError> {
        let rows = sqlx::query(
            "SELECT transfer_id, from_user, to_user, amount, created_at
             FROM transfers_tb
             WHERE from_user = $1 OR to_user = $1
             ORDER BY created_at DESC, transfer_id DESC
             LIMIT 100",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(TransferRecord {
                transfer_id: row.try_get("transfer_id")?,
                from_user: row.try_get("from_user")?,
                to_user: row.try_get("to_user")?,
                amount: row.try_get("amount")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::new_token_id;
    use rand::Rng;
    use sqlx::postgres::PgPoolOptions;

    // These tests exercise the real store when DATABASE_URL points at a
    // PostgreSQL instance and silently skip otherwise.
    async fn create_test_store() -> Option<PgLedgerStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .ok()?;
        crate::db::init_schema(&pool).await.ok()?;
        Some(PgLedgerStore::new(pool))
    }

    fn fresh_user() -> i64 {
        rand::thread_rng().gen_range(1_000_000_000..i64::MAX)
    }

    #[tokio::test]
    async fn pg_wallet_lazy_create_and_delta() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };
        let user = fresh_user();

        let wallet = store.get_wallet(user).await.unwrap();
        assert_eq!(wallet.available, Decimal::ZERO);
        assert_eq!(wallet.reserved, Decimal::ZERO);

        let wallet = store
            .apply_wallet_delta(user, Decimal::from(100), Decimal::ZERO)
            .await
            .unwrap();
        assert_eq!(wallet.available, Decimal::from(100));

        let err = store
            .apply_wallet_delta(user, Decimal::from(-150), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));

        // Failed delta must not have touched the row
        let wallet = store.get_wallet(user).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(100));
    }

    #[tokio::test]
    async fn pg_reserve_and_redeem_roundtrip() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };
        let issuer = fresh_user();
        let claimant = fresh_user();

        store
            .apply_wallet_delta(issuer, Decimal::from(100), Decimal::ZERO)
            .await
            .unwrap();

        let token = Token::issue(issuer, Decimal::from(40), "hash".to_string());
        let wallet = store.reserve_token(&token).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(60));
        assert_eq!(wallet.reserved, Decimal::from(40));

        let settled = store.redeem_token(token.token_id, claimant).await.unwrap();
        assert!(settled.redeemed_at.is_some());
        assert_eq!(settled.redeemed_by, Some(claimant));

        let issuer_wallet = store.get_wallet(issuer).await.unwrap();
        assert_eq!(issuer_wallet.available, Decimal::from(60));
        assert_eq!(issuer_wallet.reserved, Decimal::ZERO);

        let claimant_wallet = store.get_wallet(claimant).await.unwrap();
        assert_eq!(claimant_wallet.available, Decimal::from(40));

        // Second redeem loses the compare-and-set
        let err = store
            .redeem_token(token.token_id, claimant)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRedeemed));
    }

    #[tokio::test]
    async fn pg_missing_token_is_not_found() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };

        let err = store.get_token(new_token_id()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("Token")));

        let err = store
            .redeem_token(new_token_id(), fresh_user())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("Token")));
    }
}
