//! Authorization gate middlewares.
//!
//! Two stages: identity ("are you someone") resolves the bearer token
//! into a user, role ("are you allowed here") compares that user's role
//! against the one the route requires.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Extension;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{Result, ServerError};
use crate::response::Envelope;
use crate::user::{User, UserType};
use crate::AppState;

const BEARER: &str = "Bearer ";

/// Shown when the role stage denies a request.
pub const ACCESS_DENIED_MESSAGE: &str = "You not have access to this route";

/// Token string the current request authenticated with.
///
/// Kept next to the resolved [`User`] so logout can invalidate exactly
/// the session that was presented.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Identity stage.
///
/// Resolves the bearer token against the token store, checks expiry,
/// loads the owning user and attaches both to the request. Applied to
/// every route except the public ones.
pub async fn identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(|header| header.strip_prefix(BEARER).unwrap_or(header).to_owned())
        .ok_or(ServerError::Unauthorized)?;

    let user_id = state
        .sessions()
        .resolve(&token)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    let user = state
        .users()
        .find_by_id(&user_id)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}

/// Role stage.
///
/// Denial is a logical failure: HTTP 200 with `success: false`, the
/// handler never runs.
pub async fn require_super_admin(
    Extension(user): Extension<User>,
    req: Request,
    next: Next,
) -> Response {
    if user.user_type.grants(UserType::SuperAdmin) {
        next.run(req).await
    } else {
        tracing::debug!(
            user_id = user.id,
            user_type = ?user.user_type,
            "role stage denied request"
        );
        Envelope::fail(ACCESS_DENIED_MESSAGE).into_response()
    }
}

/// Requester metadata carried into audit records.
///
/// The original system resolved geolocation from the request; that
/// lookup is an external collaborator, the raw ip and user-agent string
/// stand in for it here.
#[derive(Clone, Debug)]
pub struct ClientMeta {
    pub ip: String,
    pub browser_info: String,
}

const UNKNOWN: &str = "unknown";

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        // Direct connections carry no forwarding header; the listener's
        // peer address stands in when it is available.
        let ip = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| UNKNOWN.to_owned());

        let browser_info = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| UNKNOWN.to_owned());

        Ok(Self { ip, browser_info })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::error::UNAUTHORIZED_MESSAGE;
    use crate::user::UserStatus;
    use crate::*;

    #[sqlx::test]
    async fn test_missing_token_is_401(pool: Pool<Postgres>) {
        let state = test_state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/my-profile",
            None,
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
    }

    #[sqlx::test]
    async fn test_expired_token_is_401(pool: Pool<Postgres>) {
        let state = test_state(pool.clone());
        let app = app(state.clone());
        let user_id = seed_user(
            &state,
            "jodoe",
            "password-123",
            UserType::Customer,
            UserStatus::Active,
        )
        .await;

        // Persist a token whose validity window is already over.
        let stale = token::Session {
            valid_till: chrono::Utc::now() - chrono::Duration::hours(1),
            ..token::Session::generate()
        };
        state.sessions().insert(&stale, &user_id).await.unwrap();

        let response = make_request(
            app,
            Method::GET,
            "/my-profile",
            Some(stale.token.as_str()),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_meta_prefers_forwarded_header() {
        let request = axum::http::Request::builder()
            .uri("/login")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header(header::USER_AGENT, "warden-test/1.0")
            .extension(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4242))))
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let meta = ClientMeta::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(meta.ip, "203.0.113.9");
        assert_eq!(meta.browser_info, "warden-test/1.0");
    }

    #[tokio::test]
    async fn test_client_meta_falls_back_on_peer_address() {
        let request = axum::http::Request::builder()
            .uri("/login")
            .extension(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4242))))
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let meta = ClientMeta::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(meta.ip, "192.0.2.7");
        assert_eq!(meta.browser_info, UNKNOWN);
    }

    #[sqlx::test]
    async fn test_unknown_token_is_401(pool: Pool<Postgres>) {
        let state = test_state(pool);
        let app = app(state);

        let bogus = "0".repeat(64);
        let response = make_request(
            app,
            Method::GET,
            "/my-profile",
            Some(bogus.as_str()),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
