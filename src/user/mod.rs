mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
///
/// Serialization is the public projection: `password` and internal
/// ordering never leave the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    #[serde(skip)]
    pub password: String,
    pub user_type: UserType,
    pub status: UserStatus,
    #[serde(skip)]
    pub order_number: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Role of a [`User`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Customer,
    Admin,
    SuperAdmin,
}

impl UserType {
    /// Policy evaluation for the role stage: does this identity satisfy
    /// the role a route requires?
    pub fn grants(self, required: UserType) -> bool {
        self == required
    }
}

/// Account state of a [`User`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Unverified,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_policy_requires_exact_match() {
        assert!(UserType::SuperAdmin.grants(UserType::SuperAdmin));
        assert!(!UserType::Admin.grants(UserType::SuperAdmin));
        assert!(!UserType::Customer.grants(UserType::SuperAdmin));
    }

    #[test]
    fn test_serialized_user_hides_password() {
        let user = User {
            id: "a1".into(),
            full_name: "Jo Doe".into(),
            username: "jodoe".into(),
            email: Some("jo@doe.com".into()),
            mobile: None,
            password: "$argon2id$secret".into(),
            user_type: UserType::Customer,
            status: UserStatus::Active,
            order_number: 1,
            created_at: chrono::Utc::now(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("order_number").is_none());
        assert_eq!(value["user_type"], "CUSTOMER");
        assert_eq!(value["status"], "ACTIVE");
    }
}
