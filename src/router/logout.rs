//! Logout route: invalidate the presented session.

use axum::Extension;
use axum::extract::State;

use crate::AppState;
use crate::error::Result;
use crate::middleware::SessionToken;
use crate::response::Envelope;
use crate::user::User;

pub const LOGGED_OUT_MESSAGE: &str = "User logged out successfully";

/// Handler for `PUT /logout`.
///
/// The token row is deleted; presenting the same token again fails the
/// identity stage.
pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<Envelope> {
    state.sessions().revoke(&token).await?;

    tracing::info!(user_id = user.id, "user logged out");

    Ok(Envelope::empty(LOGGED_OUT_MESSAGE))
}
