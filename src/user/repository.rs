//! Handle `users` table requests.

use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::user::{User, UserStatus, UserType};

const USER_COLUMNS: &str = "id, full_name, username, email, mobile, password, \
     user_type, status, order_number, created_at";

/// Fields needed to persist a new [`User`].
#[derive(Clone, Debug)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Already hashed; plaintext never reaches the repository.
    pub password: String,
    pub user_type: UserType,
    pub status: UserStatus,
}

/// Optional field updates for an existing [`User`].
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub user_type: Option<UserType>,
}

/// Records to skip for a one-based page.
pub fn page_offset(per_page: i64, page_number: i64) -> i64 {
    per_page * (page_number - 1)
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a [`NewUser`] and return the generated id.
    pub async fn insert(&self, user: &NewUser) -> Result<String> {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        let id = hex::encode(bytes);

        sqlx::query(
            r#"INSERT INTO users (id, full_name, username, email, mobile, password, user_type, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.password)
        .bind(user.user_type)
        .bind(user.status)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Find a user whose email or username equals the supplied
    /// identifier.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Find a user by `id`.
    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Whether another user already holds one of the unique fields.
    ///
    /// This is a pre-check for friendlier messages; unique indexes close
    /// the race at the store level.
    pub async fn conflict_exists(
        &self,
        username: &str,
        email: Option<&str>,
        mobile: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"SELECT EXISTS(
                SELECT 1 FROM users
                WHERE (username = $1 OR email = $2 OR mobile = $3)
                AND ($4::TEXT IS NULL OR id <> $4)
            ) AS conflict"#,
        )
        .bind(username)
        .bind(email)
        .bind(mobile)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("conflict"))
    }

    /// One page of users, newest `order_number` first.
    ///
    /// Sorting is fixed; search/sort inputs of the listing contract are
    /// reserved and not applied here.
    pub async fn list(&self, per_page: i64, page_number: i64) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users
             ORDER BY order_number DESC LIMIT $1 OFFSET $2"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(per_page)
            .bind(page_offset(per_page, page_number))
            .fetch_all(&self.pool)
            .await?)
    }

    /// Apply [`UserChanges`] to a user; absent fields keep their value.
    ///
    /// Returns `false` when no user matches `id`.
    pub async fn update(&self, user_id: &str, changes: &UserChanges) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE users SET
                full_name = COALESCE($1, full_name),
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                mobile = COALESCE($4, mobile),
                user_type = COALESCE($5, user_type)
            WHERE id = $6"#,
        )
        .bind(&changes.full_name)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.mobile)
        .bind(changes.user_type)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Change the `status` field of a user.
    ///
    /// Returns `false` when no user matches `id`.
    pub async fn update_status(
        &self,
        user_id: &str,
        status: UserStatus,
    ) -> Result<bool> {
        let result =
            sqlx::query(r#"UPDATE users SET status = $1 WHERE id = $2"#)
                .bind(status)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}
