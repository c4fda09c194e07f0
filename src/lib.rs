//! warden is a user-management and authentication backend.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
pub mod authlog;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod middleware;
pub mod response;
pub mod router;
pub mod token;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::ServerError;

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
}

impl AppState {
    /// Repository over the `users` table.
    pub fn users(&self) -> user::UserRepository {
        user::UserRepository::new(self.db.postgres.clone())
    }

    /// Store over the `tokens` table.
    pub fn sessions(&self) -> token::SessionStore {
        token::SessionStore::new(self.db.postgres.clone())
    }

    /// Repository over the `auth_logs` table.
    pub fn auth_logs(&self) -> authlog::AuthLogRepository {
        authlog::AuthLogRepository::new(self.db.postgres.clone())
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    router::router(state.clone())
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let postgres = config.postgres.clone().unwrap_or_default();
    let db = database::Database::new(
        &postgres.address,
        postgres
            .username
            .as_deref()
            .unwrap_or(database::DEFAULT_CREDENTIALS),
        postgres
            .password
            .as_deref()
            .unwrap_or(database::DEFAULT_CREDENTIALS),
        postgres
            .database
            .as_deref()
            .unwrap_or(database::DEFAULT_DATABASE_NAME),
        postgres.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
    )
    .await?;

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);

    Ok(AppState {
        config: Arc::new(config),
        db,
        crypto,
    })
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Collect a response body into JSON.
#[cfg(test)]
pub async fn body_json(
    response: axum::http::Response<axum::body::Body>,
) -> serde_json::Value {
    use http_body_util::BodyExt;

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Test state over an existing pool, with fast argon2 parameters.
#[cfg(test)]
pub fn test_state(pool: sqlx::PgPool) -> AppState {
    let mut config = config::Configuration::default();
    config.name = "warden-test".to_owned();

    AppState {
        config: Arc::new(config),
        db: database::Database { postgres: pool },
        crypto: Arc::new(crypto::tests::test_crypto()),
    }
}

/// Insert a user directly through the repository; returns its id.
#[cfg(test)]
pub async fn seed_user(
    state: &AppState,
    username: &str,
    password: &str,
    user_type: user::UserType,
    status: user::UserStatus,
) -> String {
    let password = state.crypto.hash_password(password.as_bytes()).unwrap();
    state
        .users()
        .insert(&user::NewUser {
            full_name: "Jo Doe".to_owned(),
            username: username.to_owned(),
            email: Some(format!("{username}@example.com")),
            mobile: None,
            password,
            user_type,
            status,
        })
        .await
        .unwrap()
}

/// Mint and persist a session for a user; returns the bearer token.
#[cfg(test)]
pub async fn authenticate(state: &AppState, user_id: &str) -> String {
    let session = token::Session::generate();
    state.sessions().insert(&session, user_id).await.unwrap();
    session.token
}
