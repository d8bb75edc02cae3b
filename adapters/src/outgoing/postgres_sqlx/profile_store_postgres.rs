use sqlx::{PgExecutor, PgPool, postgres::PgRow};
use tracing::{debug, instrument};

use domain::auth::UserId;
use domain::credits::{CreditAmount, CreditError, CreditOutcome, Profile};
use wornshot_application::{error::AppResult, ports::outgoing::profile_store::ProfileStorePort};

use super::utils::{PostgresExecutor, column};

/// Conditional decrement: touches the row only when the balance covers the
/// amount, so the sufficiency check and the write are one statement.
pub(super) const DEDUCT_SQL: &str = r"
    UPDATE profiles
    SET credits = credits - $2, updated_at = now()
    WHERE id = $1 AND credits >= $2
    RETURNING credits
";

/// Guarded increment: a sum past the `INTEGER` range matches no row instead
/// of raising an out-of-range error.
pub(super) const ADD_SQL: &str = r"
    UPDATE profiles
    SET credits = credits + $2, updated_at = now()
    WHERE id = $1 AND credits <= 2147483647 - $2
    RETURNING credits
";

const SELECT_PROFILE_SQL: &str = r"
    SELECT id, credits, is_subscriber, created_at, updated_at
    FROM profiles
    WHERE id = $1
";

const INSERT_PROFILE_SQL: &str = r"
    INSERT INTO profiles (id, credits, is_subscriber)
    VALUES ($1, $2, false)
    ON CONFLICT (id) DO NOTHING
";

pub struct PostgresProfileStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresProfileStoreAdapter {
    pub fn new(pool: PgPool, query_timeout_secs: u64) -> Self {
        Self {
            pool,
            executor: PostgresExecutor::new(query_timeout_secs),
        }
    }
}

fn profile_from_row(row: &PgRow) -> AppResult<Profile> {
    Ok(Profile {
        id: UserId::from_uuid(column(row, "id")?),
        credits: column(row, "credits")?,
        is_subscriber: column(row, "is_subscriber")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn rejected_deduct_reason(balance: Option<i32>, amount: CreditAmount) -> CreditError {
    match balance {
        Some(available) => CreditError::InsufficientCredits {
            required: amount.get(),
            available,
        },
        None => CreditError::UserNotFound,
    }
}

fn rejected_add_reason(balance: Option<i32>) -> CreditError {
    match balance {
        Some(_) => CreditError::BalanceOverflow,
        None => CreditError::UserNotFound,
    }
}

async fn current_balance<'c, E>(
    executor: &PostgresExecutor,
    conn: E,
    user_id: &UserId,
) -> AppResult<Option<i32>>
where
    E: PgExecutor<'c>,
{
    let row = executor
        .execute_with_timeout(
            move || {
                sqlx::query("SELECT credits FROM profiles WHERE id = $1")
                    .bind(user_id.as_uuid())
                    .fetch_optional(conn)
            },
            &format!("Failed to read balance for user {user_id}"),
        )
        .await?;

    row.as_ref().map(|row| column(row, "credits")).transpose()
}

/// Works out why a conditional decrement matched no row.
pub(super) async fn explain_rejected_deduct<'c, E>(
    executor: &PostgresExecutor,
    conn: E,
    user_id: &UserId,
    amount: CreditAmount,
) -> AppResult<CreditError>
where
    E: PgExecutor<'c>,
{
    let balance = current_balance(executor, conn, user_id).await?;
    Ok(rejected_deduct_reason(balance, amount))
}

/// Works out why a guarded increment matched no row.
pub(super) async fn explain_rejected_add<'c, E>(
    executor: &PostgresExecutor,
    conn: E,
    user_id: &UserId,
) -> AppResult<CreditError>
where
    E: PgExecutor<'c>,
{
    let balance = current_balance(executor, conn, user_id).await?;
    Ok(rejected_add_reason(balance))
}

#[async_trait::async_trait]
impl ProfileStorePort for PostgresProfileStoreAdapter {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(SELECT_PROFILE_SQL)
                        .bind(user_id.as_uuid())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to load profile for user {user_id}"),
            )
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn create_profile(&self, user_id: &UserId, initial_credits: i32) -> AppResult<Profile> {
        let inserted = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(INSERT_PROFILE_SQL)
                        .bind(user_id.as_uuid())
                        .bind(initial_credits.max(0))
                        .execute(&self.pool)
                },
                &format!("Failed to create profile for user {user_id}"),
            )
            .await?;

        if inserted.rows_affected() == 1 {
            debug!(initial_credits, "Inserted new profile");
        } else {
            debug!("Profile already existed, reusing stored row");
        }

        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(SELECT_PROFILE_SQL)
                        .bind(user_id.as_uuid())
                        .fetch_one(&self.pool)
                },
                &format!("Failed to read back profile for user {user_id}"),
            )
            .await?;

        profile_from_row(&row)
    }

    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: CreditAmount,
    ) -> AppResult<CreditOutcome> {
        let updated = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(DEDUCT_SQL)
                        .bind(user_id.as_uuid())
                        .bind(amount.get())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to deduct credits for user {user_id}"),
            )
            .await?;

        if let Some(row) = updated {
            let new_balance: i32 = column(&row, "credits")?;
            debug!(new_balance, "Deducted credits");
            return Ok(Ok(new_balance));
        }

        let reason = explain_rejected_deduct(&self.executor, &self.pool, user_id, amount).await?;
        Ok(Err(reason))
    }

    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    async fn add_credits(&self, user_id: &UserId, amount: CreditAmount) -> AppResult<CreditOutcome> {
        let updated = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(ADD_SQL)
                        .bind(user_id.as_uuid())
                        .bind(amount.get())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to add credits for user {user_id}"),
            )
            .await?;

        match updated {
            Some(row) => {
                let new_balance: i32 = column(&row, "credits")?;
                debug!(new_balance, "Added credits");
                Ok(Ok(new_balance))
            }
            None => {
                let reason = explain_rejected_add(&self.executor, &self.pool, user_id).await?;
                Ok(Err(reason))
            }
        }
    }
}
