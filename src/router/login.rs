//! Login route: credential check, session issuance, audit trail.

use std::sync::Arc;

use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::authlog::{AuthEvent, AuthLogKind};
use crate::error::Result;
use crate::middleware::ClientMeta;
use crate::response::Envelope;
use crate::router::Valid;
use crate::token::Session;
use crate::user::UserStatus;

/// Deliberately identical for unknown identifiers and wrong passwords:
/// the response must not reveal which one was wrong.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Email, Username or Password is Incorrect";
pub const NOT_ACTIVE_MESSAGE: &str = "Your account is not active";
pub const LOGGED_IN_MESSAGE: &str = "User LoggedIn successfully";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    /// Username or email.
    #[validate(length(
        min = 4,
        max = 100,
        message = "Username must be 4 to 100 characters long."
    ))]
    pub username: String,
    #[validate(length(
        min = 8,
        max = 70,
        message = "Password must be 8 to 70 characters long."
    ))]
    pub password: String,
}

/// Handler for `POST /login`.
///
/// Exactly one audit record per attempt; exactly one token row on
/// success only.
pub async fn handler(
    State(state): State<AppState>,
    meta: ClientMeta,
    Valid(body): Valid<Body>,
) -> Result<Envelope> {
    let Some(user) = state.users().find_by_identifier(&body.username).await?
    else {
        state
            .auth_logs()
            .record(AuthEvent {
                kind: AuthLogKind::InvalidEmail,
                user_id: None,
                username: &body.username,
                email: &body.username,
                device_ip: &meta.ip,
                success: false,
                message: "User entered wrong email or username",
                browser_info: &meta.browser_info,
            })
            .await?;

        return Ok(Envelope::fail(GENERIC_FAILURE_MESSAGE));
    };

    // Argon2 verification is deliberately slow; keep it off the
    // async workers.
    let crypto = Arc::clone(&state.crypto);
    let (password, stored_hash) = (body.password.clone(), user.password.clone());
    let matched = tokio::task::spawn_blocking(move || {
        crypto.verify_password(password.as_bytes(), &stored_hash)
    })
    .await??;

    if !matched {
        state
            .auth_logs()
            .record(AuthEvent {
                kind: AuthLogKind::WrongPassword,
                user_id: Some(user.id.as_str()),
                username: &body.username,
                email: &body.username,
                device_ip: &meta.ip,
                success: false,
                message: "User entered wrong password",
                browser_info: &meta.browser_info,
            })
            .await?;

        return Ok(Envelope::fail(GENERIC_FAILURE_MESSAGE));
    }

    if user.status != UserStatus::Active {
        state
            .auth_logs()
            .record(AuthEvent {
                kind: AuthLogKind::Login,
                user_id: Some(user.id.as_str()),
                username: &body.username,
                email: &body.username,
                device_ip: &meta.ip,
                success: false,
                message: "User is not active but entered correct password and email",
                browser_info: &meta.browser_info,
            })
            .await?;

        return Ok(Envelope::fail(NOT_ACTIVE_MESSAGE));
    }

    let session = Session::generate();
    state.sessions().insert(&session, &user.id).await?;

    state
        .auth_logs()
        .record(AuthEvent {
            kind: AuthLogKind::Login,
            user_id: Some(user.id.as_str()),
            username: &body.username,
            email: &body.username,
            device_ip: &meta.ip,
            success: true,
            message: "User logged in successfully",
            browser_info: &meta.browser_info,
        })
        .await?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(Envelope::ok(
        serde_json::json!({
            "id": user.id,
            "token": session.token,
            "full_name": user.full_name,
            "user_type": user.user_type,
        }),
        LOGGED_IN_MESSAGE,
    ))
}
