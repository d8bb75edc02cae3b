use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::UserId;
use crate::error::DomainError;

pub const DEFAULT_INITIAL_CREDITS: i32 = 6;
pub const DEFAULT_MAIN_IMAGE_COST: i32 = 1;
pub const DEFAULT_MULTI_POSE_COST: i32 = 5;

/// Per-user credit balance row. `credits` never drops below zero once a
/// mutation is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub credits: i32,
    pub is_subscriber: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Profile {
    pub fn new(id: UserId, initial_credits: i32, now: OffsetDateTime) -> Self {
        Self {
            id,
            credits: initial_credits.max(0),
            is_subscriber: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_afford(&self, amount: CreditAmount) -> bool {
        self.credits >= amount.get()
    }

    /// Checks sufficiency and applies the decrement as one step. On failure
    /// the profile is left untouched.
    pub fn deduct(&mut self, amount: CreditAmount, now: OffsetDateTime) -> Result<i32, CreditError> {
        if !self.can_afford(amount) {
            return Err(CreditError::InsufficientCredits {
                required: amount.get(),
                available: self.credits,
            });
        }

        self.credits -= amount.get();
        self.updated_at = now;
        Ok(self.credits)
    }

    pub fn add(&mut self, amount: CreditAmount, now: OffsetDateTime) -> Result<i32, CreditError> {
        self.credits = self
            .credits
            .checked_add(amount.get())
            .ok_or(CreditError::BalanceOverflow)?;
        self.updated_at = now;
        Ok(self.credits)
    }
}

/// A strictly positive number of credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CreditAmount(i32);

impl CreditAmount {
    pub fn new(amount: i32) -> Result<Self, CreditError> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount { amount: i64::from(amount) });
        }
        Ok(Self(amount))
    }

    pub fn from_i64(amount: i64) -> Result<Self, CreditError> {
        let narrowed = i32::try_from(amount).map_err(|_| CreditError::InvalidAmount { amount })?;
        Self::new(narrowed)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl Display for CreditAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditAction {
    Deduct,
    Add,
}

impl CreditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deduct => "deduct",
            Self::Add => "add",
        }
    }
}

impl FromStr for CreditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deduct" => Ok(Self::Deduct),
            "add" => Ok(Self::Add),
            other => Err(DomainError::InvalidCreditAction(other.to_string())),
        }
    }
}

impl Display for CreditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Expected business outcomes of a balance mutation. These are returned as
/// values, not raised as infrastructure faults. The display strings are the
/// user-facing API messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreditError {
    #[error("无效金额")]
    InvalidAmount { amount: i64 },

    #[error("积分不足")]
    InsufficientCredits { required: i32, available: i32 },

    #[error("用户不存在")]
    UserNotFound,

    #[error("积分余额溢出")]
    BalanceOverflow,
}

/// Result of a ledger mutation: the post-write balance, or the reason it was
/// rejected without writing.
pub type CreditOutcome = Result<i32, CreditError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPricing {
    pub initial_credits: i32,
    pub main_image_cost: CreditAmount,
    pub multi_pose_cost: CreditAmount,
}

impl CreditPricing {
    pub fn new(
        initial_credits: i32,
        main_image_cost: i32,
        multi_pose_cost: i32,
    ) -> Result<Self, CreditError> {
        Ok(Self {
            initial_credits: initial_credits.max(0),
            main_image_cost: CreditAmount::new(main_image_cost)?,
            multi_pose_cost: CreditAmount::new(multi_pose_cost)?,
        })
    }
}

impl Default for CreditPricing {
    fn default() -> Self {
        Self {
            initial_credits: DEFAULT_INITIAL_CREDITS,
            main_image_cost: CreditAmount(DEFAULT_MAIN_IMAGE_COST),
            multi_pose_cost: CreditAmount(DEFAULT_MULTI_POSE_COST),
        }
    }
}
