use std::fmt::Display;

use sqlx::{PgPool, postgres::PgRow};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::auth::UserId;
use domain::credits::{CreditAmount, CreditError};
use domain::generation::GenerationKind;
use domain::reservation::{Reservation, ReservationId, ReservationStatus};
use wornshot_application::{
    error::{AppError, AppResult},
    ports::outgoing::reservation_store::{ReservationRefund, ReservationStorePort},
};

use super::profile_store_postgres::{
    ADD_SQL, DEDUCT_SQL, explain_rejected_add, explain_rejected_deduct,
};
use super::utils::{PostgresExecutor, begin_transaction, column, commit_transaction};

const RESERVATION_COLUMNS: &str =
    "id, user_id, kind, amount, status, created_at, expires_at, settled_at";

pub struct PostgresReservationStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresReservationStoreAdapter {
    pub fn new(pool: PgPool, query_timeout_secs: u64) -> Self {
        Self {
            pool,
            executor: PostgresExecutor::new(query_timeout_secs),
        }
    }
}

fn corrupt(field: &str, detail: impl Display) -> AppError {
    AppError::DatabaseError {
        message: format!("Stored reservation has invalid {field}: {detail}"),
    }
}

fn reservation_from_row(row: &PgRow) -> AppResult<Reservation> {
    let kind: String = column(row, "kind")?;
    let status: String = column(row, "status")?;
    let amount: i32 = column(row, "amount")?;

    Ok(Reservation {
        id: ReservationId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        kind: kind.parse::<GenerationKind>().map_err(|e| corrupt("kind", e))?,
        amount: CreditAmount::new(amount).map_err(|e| corrupt("amount", e))?,
        status: status
            .parse::<ReservationStatus>()
            .map_err(|e| corrupt("status", e))?,
        created_at: column(row, "created_at")?,
        expires_at: column(row, "expires_at")?,
        settled_at: column(row, "settled_at")?,
    })
}

fn settle_sql(status: ReservationStatus) -> String {
    format!(
        "UPDATE credit_reservations SET status = '{}', settled_at = $2 \
         WHERE id = $1 AND status = 'pending' RETURNING {RESERVATION_COLUMNS}",
        status.as_str()
    )
}

#[async_trait::async_trait]
impl ReservationStorePort for PostgresReservationStoreAdapter {
    #[instrument(skip(self, reservation), fields(reservation_id = %reservation.id, user_id = %reservation.user_id))]
    async fn reserve(&self, reservation: &Reservation) -> AppResult<Result<i32, CreditError>> {
        let mut tx = begin_transaction(&self.pool).await?;

        let conn = &mut *tx;
        let deducted = self
            .executor
            .execute_with_timeout(
                move || {
                    sqlx::query(DEDUCT_SQL)
                        .bind(reservation.user_id.as_uuid())
                        .bind(reservation.amount.get())
                        .fetch_optional(conn)
                },
                "Failed to deduct reservation amount",
            )
            .await?;

        let Some(row) = deducted else {
            let reason = explain_rejected_deduct(
                &self.executor,
                &mut *tx,
                &reservation.user_id,
                reservation.amount,
            )
            .await?;
            return Ok(Err(reason));
        };
        let new_balance: i32 = column(&row, "credits")?;

        let conn = &mut *tx;
        self.executor
            .execute_with_timeout(
                move || {
                    sqlx::query(
                        r"
                    INSERT INTO credit_reservations
                        (id, user_id, kind, amount, status, created_at, expires_at)
                    VALUES ($1, $2, $3, $4, 'pending', $5, $6)
                    ",
                    )
                    .bind(reservation.id.as_uuid())
                    .bind(reservation.user_id.as_uuid())
                    .bind(reservation.kind.as_str())
                    .bind(reservation.amount.get())
                    .bind(reservation.created_at)
                    .bind(reservation.expires_at)
                    .execute(conn)
                },
                "Failed to insert reservation",
            )
            .await?;

        commit_transaction(tx).await?;

        debug!(new_balance, amount = reservation.amount.get(), "Reserved credits");
        Ok(Ok(new_balance))
    }

    #[instrument(skip(self), fields(reservation_id = %id))]
    async fn confirm(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Reservation>> {
        let sql = settle_sql(ReservationStatus::Confirmed);
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(id.as_uuid())
                        .bind(now)
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to confirm reservation {id}"),
            )
            .await?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    #[instrument(skip(self), fields(reservation_id = %id))]
    async fn refund(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<ReservationRefund>> {
        let mut tx = begin_transaction(&self.pool).await?;

        let sql = settle_sql(ReservationStatus::Refunded);
        let sql = sql.as_str();
        let conn = &mut *tx;
        let settled = self
            .executor
            .execute_with_timeout(
                move || {
                    sqlx::query(sql)
                        .bind(id.as_uuid())
                        .bind(now)
                        .fetch_optional(conn)
                },
                &format!("Failed to mark reservation {id} refunded"),
            )
            .await?;

        let Some(row) = settled else {
            return Ok(None);
        };
        let reservation = reservation_from_row(&row)?;
        let user_id = *reservation.user_id.as_uuid();
        let amount = reservation.amount.get();

        let conn = &mut *tx;
        let credited = self
            .executor
            .execute_with_timeout(
                move || {
                    sqlx::query(ADD_SQL)
                        .bind(user_id)
                        .bind(amount)
                        .fetch_optional(conn)
                },
                "Failed to credit refunded reservation",
            )
            .await?;

        // Returning without commit rolls the status change back to pending.
        let Some(credited) = credited else {
            let reason = explain_rejected_add(&self.executor, &mut *tx, &reservation.user_id).await?;
            return Err(AppError::Credit(reason));
        };
        let new_balance: i32 = column(&credited, "credits")?;

        commit_transaction(tx).await?;

        debug!(new_balance, "Refunded reservation");
        Ok(Some(ReservationRefund {
            reservation,
            new_balance,
        }))
    }

    #[instrument(skip(self), fields(reservation_id = %id))]
    async fn get_reservation(&self, id: &ReservationId) -> AppResult<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM credit_reservations WHERE id = $1");
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to load reservation {id}"),
            )
            .await?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: usize,
        exclude: &[ReservationId],
    ) -> AppResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM credit_reservations \
             WHERE status = 'pending' AND expires_at <= $1 AND NOT (id = ANY($3)) \
             ORDER BY expires_at LIMIT $2"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let exclude: Vec<Uuid> = exclude.iter().map(|id| *id.as_uuid()).collect();
        let rows = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(now)
                        .bind(limit)
                        .bind(exclude.as_slice())
                        .fetch_all(&self.pool)
                },
                "Failed to list expired reservations",
            )
            .await?;

        rows.iter().map(reservation_from_row).collect()
    }
}
