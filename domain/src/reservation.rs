use std::fmt;
use std::str::FromStr;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::UserId;
use crate::credits::CreditAmount;
use crate::error::DomainError;
use crate::generation::GenerationKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Refunded,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "refunded" => Ok(Self::Refunded),
            other => Err(DomainError::InvalidReservationStatus(other.to_string())),
        }
    }
}

/// Credits held against an in-flight generation. Settles exactly once:
/// confirmed when the work succeeded, refunded when it failed or expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub kind: GenerationKind,
    pub amount: CreditAmount,
    pub status: ReservationStatus,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub settled_at: Option<OffsetDateTime>,
}

impl Reservation {
    pub fn new(
        user_id: UserId,
        kind: GenerationKind,
        amount: CreditAmount,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            user_id,
            kind,
            amount,
            status: ReservationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            settled_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.is_pending() && self.expires_at <= now
    }

    /// Moves a pending reservation to `status`. Returns false, without
    /// changing anything, when it was already settled.
    pub fn settle(&mut self, status: ReservationStatus, now: OffsetDateTime) -> bool {
        if self.status.is_settled() || !status.is_settled() {
            return false;
        }
        self.status = status;
        self.settled_at = Some(now);
        true
    }
}
