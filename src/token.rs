//! Session token issuance and validation.
//!
//! Tokens are opaque 64-character hex strings. Each issued token is
//! persisted in the `tokens` table and resolved against it on every
//! authenticated request; invalidation removes the row.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::{PgPool, Row};

use crate::error::Result;

pub const TOKEN_LENGTH: u64 = 64;
/// Sessions live 30 days from issuance.
pub const VALIDITY_DAYS: i64 = 30;

/// A freshly minted session credential.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: String,
    pub valid_till: DateTime<Utc>,
}

impl Session {
    /// Mint a new opaque token with its expiry.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);

        Self {
            token: hex::encode(bytes),
            valid_till: Utc::now() + Duration::days(VALIDITY_DAYS),
        }
    }
}

/// Handle `tokens` table requests.
#[derive(Clone)]
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    /// Create a new [`SessionStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a token bound to a user.
    pub async fn insert(&self, session: &Session, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO tokens (token, user_id, valid_till) VALUES ($1, $2, $3)"#,
        )
        .bind(&session.token)
        .bind(user_id)
        .bind(session.valid_till)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolve a presented token into its owning user id.
    ///
    /// Unknown and expired tokens both resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"SELECT user_id FROM tokens WHERE token = $1 AND valid_till > NOW()"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get("user_id")))
    }

    /// Invalidate a token by deleting its row.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM tokens WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_is_opaque_hex() {
        let session = Session::generate();

        assert_eq!(session.token.len(), TOKEN_LENGTH as usize);
        assert!(session.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(Session::generate().token, Session::generate().token);
    }

    #[test]
    fn test_expiry_is_thirty_days_out() {
        let session = Session::generate();
        let expected = Utc::now() + Duration::days(VALIDITY_DAYS);
        let drift = (session.valid_till - expected).num_seconds().abs();

        assert!(drift < 5, "valid_till drifted {drift}s from now+30d");
    }
}
