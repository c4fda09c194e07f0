//! Append-only audit trail of authentication attempts.
//!
//! Every login attempt writes exactly one record, win or lose. Records
//! are never mutated or deleted.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;

/// Classification of an authentication event.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "auth_log_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthLogKind {
    /// Credentials were verified; `success` tells whether the account
    /// could actually log in.
    Login,
    /// No account matched the presented identifier.
    InvalidEmail,
    /// The identifier matched but the password did not.
    WrongPassword,
}

/// One authentication attempt, as recorded.
#[derive(Clone, Debug)]
pub struct AuthEvent<'a> {
    /// Outcome classification.
    pub kind: AuthLogKind,
    /// Resolved user, when the identifier matched someone.
    pub user_id: Option<&'a str>,
    /// Identifier presented, as typed by the requester.
    pub username: &'a str,
    /// Email of the resolved user, empty when unknown.
    pub email: &'a str,
    /// Requester ip, forwarded or peer.
    pub device_ip: &'a str,
    /// Whether the attempt ended in a session.
    pub success: bool,
    /// The message the requester was answered with.
    pub message: &'a str,
    /// Requester user-agent string.
    pub browser_info: &'a str,
}

/// Handle `auth_logs` table requests.
#[derive(Clone)]
pub struct AuthLogRepository {
    pool: PgPool,
}

impl AuthLogRepository {
    /// Create a new [`AuthLogRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one audit record.
    pub async fn record(&self, event: AuthEvent<'_>) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO auth_logs
                (kind, user_id, username, email, device_ip, success, message, browser_info)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(event.kind)
        .bind(event.user_id)
        .bind(event.username)
        .bind(event.email)
        .bind(event.device_ip)
        .bind(event.success)
        .bind(event.message)
        .bind(event.browser_info)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            kind = ?event.kind,
            success = event.success,
            "auth event recorded"
        );

        Ok(())
    }
}
