//! HTTP routes and validated extractors.

pub mod login;
pub mod logout;
pub mod signup;
pub mod status;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware as AxumMiddleware};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::ServerError;
use crate::middleware;

/// Route table.
///
/// `/login` and `/signup` are public; everything else passes the
/// identity stage, and admin routes additionally the role stage.
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/add-user", post(signup::add_user))
        .route("/users-list", get(users::list))
        .route("/user-detail/{id}", get(users::detail))
        .route("/update-user/{id}", put(users::update))
        .route("/update-user-status/{id}", put(users::update_status))
        .route_layer(AxumMiddleware::from_fn(middleware::require_super_admin));

    let protected = Router::new()
        .merge(admin)
        .route("/my-profile", get(users::my_profile))
        .route("/logout", put(logout::handler))
        .route_layer(AxumMiddleware::from_fn_with_state(
            state,
            middleware::identity,
        ));

    Router::new()
        .route("/status.json", get(status::status))
        .route("/login", post(login::handler))
        .route("/signup", post(signup::signup))
        .merge(protected)
}

/// JSON body extractor running `validator` checks before the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;

        Ok(Valid(value))
    }
}

/// Query-string extractor running `validator` checks before the handler.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;

        Ok(ValidQuery(value))
    }
}
