//! Users-related HTTP API: listing, detail, update, profile, status.

use axum::Extension;
use axum::extract::{Path, State};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::AppState;
use crate::error::Result;
use crate::response::Envelope;
use crate::router::{Valid, ValidQuery};
use crate::user::{User, UserChanges, UserStatus, UserType};

pub const NOT_FOUND_MESSAGE: &str = "User not found";
pub const LIST_MESSAGE: &str = "User list got successfully";
pub const DETAIL_MESSAGE: &str = "User detail got successfully";
pub const PROFILE_MESSAGE: &str = "User profile got successfully";
pub const UPDATED_MESSAGE: &str = "User updated successfully";
pub const STATUS_UPDATED_MESSAGE: &str = "User status updated successfully";

fn validate_sort_order(order: &String) -> std::result::Result<(), ValidationError> {
    if order.is_empty() || order == "ASC" || order == "DESC" {
        return Ok(());
    }

    Err(ValidationError::new("sort_order"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(range(min = 1, message = "per_page must be a positive integer"))]
    pub per_page: i64,
    #[validate(range(
        min = 1,
        message = "page_number must be a positive integer"
    ))]
    pub page_number: i64,
    /// Reserved: accepted, validated, not applied.
    pub search_term: Option<String>,
    /// Reserved: accepted, validated, not applied.
    pub sort_field: Option<String>,
    /// Reserved: accepted, validated, not applied.
    #[validate(custom(
        function = "validate_sort_order",
        message = "sort_order must be ASC or DESC"
    ))]
    pub sort_order: Option<String>,
}

/// Handler for `GET /users-list`.
///
/// Fixed descending sort on `order_number`; no total-count metadata.
pub async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Envelope> {
    let users = state
        .users()
        .list(query.per_page, query.page_number)
        .await?;

    Ok(Envelope::ok(users, LIST_MESSAGE))
}

/// Handler for `GET /user-detail/{id}`.
pub async fn detail(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Envelope> {
    match state.users().find_by_id(&user_id).await? {
        Some(user) => Ok(Envelope::ok(user, DETAIL_MESSAGE)),
        None => Ok(Envelope::fail(NOT_FOUND_MESSAGE)),
    }
}

/// Handler for `GET /my-profile`.
pub async fn my_profile(Extension(user): Extension<User>) -> Result<Envelope> {
    Ok(Envelope::ok(user, PROFILE_MESSAGE))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBody {
    #[validate(length(min = 1, message = "Please enter Full Name"))]
    pub full_name: Option<String>,
    #[validate(
        length(
            min = 4,
            max = 100,
            message = "Username must be 4 to 100 characters long."
        ),
        custom(
            function = "super::signup::validate_username",
            message = "Username must only contain letters, digits, '.', '_' or '-'."
        )
    )]
    pub username: Option<String>,
    #[validate(custom(
        function = "super::signup::validate_email_syntax",
        message = "Please enter a valid email"
    ))]
    pub email: Option<String>,
    #[validate(custom(
        function = "super::signup::validate_mobile",
        message = "Mobile must be exactly 10 digits"
    ))]
    pub mobile: Option<String>,
    pub user_type: Option<UserType>,
}

/// Handler for `PUT /update-user/{id}`.
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Envelope> {
    let users = state.users();

    // Unique fields may not collide with another user.
    let touches_unique_field =
        body.username.is_some() || body.email.is_some() || body.mobile.is_some();
    if touches_unique_field
        && users
            .conflict_exists(
                body.username.as_deref().unwrap_or(""),
                body.email.as_deref(),
                body.mobile.as_deref(),
                Some(user_id.as_str()),
            )
            .await?
    {
        return Ok(Envelope::fail(super::signup::ALREADY_EXISTS_MESSAGE));
    }

    let changes = UserChanges {
        full_name: body.full_name,
        username: body.username,
        email: body.email.filter(|email| !email.is_empty()),
        mobile: body.mobile.filter(|mobile| !mobile.is_empty()),
        user_type: body.user_type,
    };

    if users.update(&user_id, &changes).await? {
        Ok(Envelope::empty(UPDATED_MESSAGE))
    } else {
        Ok(Envelope::fail(NOT_FOUND_MESSAGE))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusBody {
    pub status: UserStatus,
}

/// Handler for `PUT /update-user-status/{id}`.
pub async fn update_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Valid(body): Valid<StatusBody>,
) -> Result<Envelope> {
    if state.users().update_status(&user_id, body.status).await? {
        Ok(Envelope::empty(STATUS_UPDATED_MESSAGE))
    } else {
        Ok(Envelope::fail(NOT_FOUND_MESSAGE))
    }
}
