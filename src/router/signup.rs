//! User creation routes: public signup and admin add-user.
//!
//! Both entry points share the validation shape; they differ in who may
//! call them and which roles they may assign.

use std::sync::Arc;
use std::sync::LazyLock;

use axum::extract::State;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::error::Result;
use crate::response::Envelope;
use crate::router::Valid;
use crate::user::{NewUser, UserStatus, UserType};

pub const ALREADY_EXISTS_MESSAGE: &str = "User already exist";
pub const USER_ADDED_MESSAGE: &str = "User added successfully";

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap());
static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());

pub(crate) fn validate_username(
    username: &str,
) -> std::result::Result<(), ValidationError> {
    if USERNAME_PATTERN.is_match(username) {
        return Ok(());
    }

    Err(ValidationError::new("username"))
}

pub(crate) fn validate_email_syntax(
    email: &String,
) -> std::result::Result<(), ValidationError> {
    // An empty string counts as "not provided".
    if email.is_empty() || validator::ValidateEmail::validate_email(email) {
        return Ok(());
    }

    Err(ValidationError::new("email"))
}

pub(crate) fn validate_mobile(
    mobile: &String,
) -> std::result::Result<(), ValidationError> {
    if mobile.is_empty() || MOBILE_PATTERN.is_match(mobile) {
        return Ok(());
    }

    Err(ValidationError::new("mobile"))
}

fn role_not_allowed() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "user_type",
        ValidationError::new("user_type")
            .with_message("User Type is not allowed.".into()),
    );
    errors
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "Please enter Full Name"))]
    pub full_name: String,
    #[validate(
        length(
            min = 4,
            max = 100,
            message = "Username must be 4 to 100 characters long."
        ),
        custom(
            function = "validate_username",
            message = "Username must only contain letters, digits, '.', '_' or '-'."
        )
    )]
    pub username: String,
    #[validate(length(
        min = 8,
        max = 70,
        message = "Password must be 8 to 70 characters long."
    ))]
    pub password: String,
    #[validate(custom(
        function = "validate_email_syntax",
        message = "Please enter a valid email"
    ))]
    pub email: Option<String>,
    #[validate(custom(
        function = "validate_mobile",
        message = "Mobile must be exactly 10 digits"
    ))]
    pub mobile: Option<String>,
    pub user_type: UserType,
}

/// Handler for `POST /signup` (public self-registration).
///
/// Only the non-privileged role can be self-assigned.
pub async fn signup(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Envelope> {
    if body.user_type != UserType::Customer {
        return Err(role_not_allowed().into());
    }

    create_user(&state, body).await
}

/// Handler for `POST /add-user` (identity + super-admin gated).
///
/// May assign CUSTOMER or ADMIN; the elevated role itself is never
/// assignable over HTTP.
pub async fn add_user(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Envelope> {
    if body.user_type == UserType::SuperAdmin {
        return Err(role_not_allowed().into());
    }

    create_user(&state, body).await
}

async fn create_user(state: &AppState, body: Body) -> Result<Envelope> {
    let email = body.email.filter(|email| !email.is_empty());
    let mobile = body.mobile.filter(|mobile| !mobile.is_empty());

    let users = state.users();
    if users
        .conflict_exists(&body.username, email.as_deref(), mobile.as_deref(), None)
        .await?
    {
        return Ok(Envelope::fail(ALREADY_EXISTS_MESSAGE));
    }

    let crypto = Arc::clone(&state.crypto);
    let password = body.password;
    let password = tokio::task::spawn_blocking(move || {
        crypto.hash_password(password.as_bytes())
    })
    .await??;

    let new_user = NewUser {
        full_name: body.full_name,
        username: body.username,
        email,
        mobile,
        password,
        user_type: body.user_type,
        status: UserStatus::Active,
    };

    // The pre-check above races with concurrent inserts; unique indexes
    // close it, surfaced as the same logical failure.
    match users.insert(&new_user).await {
        Ok(id) => {
            tracing::info!(user_id = id, username = new_user.username, "user created");
            Ok(Envelope::empty(USER_ADDED_MESSAGE))
        }
        Err(crate::error::ServerError::Sql(err))
            if err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation()) =>
        {
            Ok(Envelope::fail(ALREADY_EXISTS_MESSAGE))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::{Pool, Postgres, Row};

    use super::*;
    use crate::*;

    fn signup_body(username: &str, user_type: &str) -> String {
        json!({
            "full_name": "Jo Doe",
            "username": username,
            "password": "password-123",
            "email": format!("{username}@example.com"),
            "mobile": "0123456789",
            "user_type": user_type,
        })
        .to_string()
    }

    #[sqlx::test]
    async fn test_signup_then_login(pool: Pool<Postgres>) {
        let state = test_state(pool);
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/signup",
            None,
            signup_body("jodoe", "CUSTOMER"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], USER_ADDED_MESSAGE);
        assert_eq!(body["data"], json!({}));

        // Signup defaults to an ACTIVE account; login works right away.
        let login = make_request(
            app,
            Method::POST,
            "/login",
            None,
            json!({ "username": "jodoe", "password": "password-123" }).to_string(),
        )
        .await;
        let login = body_json(login).await;
        assert_eq!(login["success"], true);
    }

    #[sqlx::test]
    async fn test_signup_cannot_claim_privileged_role(pool: Pool<Postgres>) {
        let state = test_state(pool.clone());
        let app = app(state);

        for role in ["ADMIN", "SUPER_ADMIN"] {
            let response = make_request(
                app.clone(),
                Method::POST,
                "/signup",
                None,
                signup_body("jodoe", role),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["success"], false);
        }

        let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 0);
    }

    #[sqlx::test]
    async fn test_add_user_is_idempotent_on_conflict(pool: Pool<Postgres>) {
        let state = test_state(pool.clone());
        let app = app(state.clone());
        let admin_id = seed_user(
            &state,
            "root-admin",
            "password-123",
            user::UserType::SuperAdmin,
            user::UserStatus::Active,
        )
        .await;
        let token = authenticate(&state, &admin_id).await;

        let first = make_request(
            app.clone(),
            Method::POST,
            "/add-user",
            Some(token.as_str()),
            signup_body("newcomer", "ADMIN"),
        )
        .await;
        let first = body_json(first).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["message"], USER_ADDED_MESSAGE);

        // Identical request again: logical failure, no second record.
        let second = make_request(
            app,
            Method::POST,
            "/add-user",
            Some(token.as_str()),
            signup_body("newcomer", "ADMIN"),
        )
        .await;
        assert_eq!(second.status(), StatusCode::OK);
        let second = body_json(second).await;
        assert_eq!(second["success"], false);
        assert_eq!(second["message"], ALREADY_EXISTS_MESSAGE);

        let row =
            sqlx::query("SELECT COUNT(*) AS count FROM users WHERE username = 'newcomer'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 1);
    }

    #[sqlx::test]
    async fn test_invalid_mobile_returns_field_message(pool: Pool<Postgres>) {
        let state = test_state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/signup",
            None,
            json!({
                "full_name": "Jo Doe",
                "username": "jodoe",
                "password": "password-123",
                "mobile": "123",
                "user_type": "CUSTOMER",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Mobile must be exactly 10 digits");
    }

    #[test]
    fn test_username_pattern() {
        assert!(validate_username("jo.doe_99-x").is_ok());
        assert!(validate_username("jo doe").is_err());
        assert!(validate_username("jo@doe").is_err());
    }
}
