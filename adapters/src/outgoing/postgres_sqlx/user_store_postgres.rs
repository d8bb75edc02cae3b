use sqlx::{PgPool, postgres::PgRow};
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::auth::{UserCredentials, UserId, UserPublic};
use wornshot_application::{
    error::{AppError, AppResult},
    ports::outgoing::user_store::UserStorePort,
};

use super::utils::{PostgresExecutor, column};

pub struct PostgresUserStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresUserStoreAdapter {
    pub fn new(pool: PgPool, query_timeout_secs: u64) -> Self {
        Self {
            pool,
            executor: PostgresExecutor::new(query_timeout_secs),
        }
    }

    async fn find_public_by(&self, filter: &str, value: &str) -> AppResult<Option<UserPublic>> {
        let sql = format!("SELECT id, email, username, created_at FROM users WHERE {filter} = $1");
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(value)
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to find user by {filter}"),
            )
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> AppResult<UserPublic> {
    Ok(UserPublic {
        id: UserId::from_uuid(column(row, "id")?),
        email: column(row, "email")?,
        username: column(row, "username")?,
        created_at: column(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl UserStorePort for PostgresUserStoreAdapter {
    #[instrument(skip(self, password_hash))]
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserPublic> {
        let user_id = Uuid::new_v4();

        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                    INSERT INTO users (id, email, username, password_hash)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, email, username, created_at
                    ",
                    )
                    .bind(user_id)
                    .bind(email)
                    .bind(username)
                    .bind(password_hash)
                    .fetch_one(&self.pool)
                },
                &format!("Failed to create user with email {}", email),
            )
            .await
            .map_err(|e| match e {
                AppError::DatabaseError { message } if message.contains("duplicate key") => {
                    AppError::ValidationError {
                        message: "User with this email or username already exists".to_string(),
                    }
                }
                other => other,
            })?;

        debug!("Created user with email {} and id {}", email, user_id);

        user_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn find_credentials_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query("SELECT id, email, password_hash FROM users WHERE email = $1")
                        .bind(email)
                        .fetch_optional(&self.pool)
                },
                "Failed to find user by email",
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserCredentials {
            id: UserId::from_uuid(column(&row, "id")?),
            email: column(&row, "email")?,
            password_hash: column(&row, "password_hash")?,
        }))
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserPublic>> {
        self.find_public_by("username", username).await
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<UserPublic>> {
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query("SELECT id, email, username, created_at FROM users WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to find user {id}"),
            )
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}
