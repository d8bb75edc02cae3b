//! In-process fakes for service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::error::{AppError, AppResult};
use crate::ports::outgoing::image_generation::{ImageGenerationPort, ImagePrompt};
use crate::ports::outgoing::password_hasher::PasswordHasherPort;
use crate::ports::outgoing::profile_store::ProfileStorePort;
use crate::ports::outgoing::reservation_store::{ReservationRefund, ReservationStorePort};
use crate::ports::outgoing::user_store::UserStorePort;
use domain::auth::{UserCredentials, UserId, UserPublic};
use domain::credits::{CreditAmount, CreditError, CreditOutcome, Profile};
use domain::reservation::{Reservation, ReservationId, ReservationStatus};

#[derive(Default)]
pub struct FakeLedger {
    profiles: Mutex<HashMap<UserId, Profile>>,
    reservations: Mutex<HashMap<ReservationId, Reservation>>,
}

impl FakeLedger {
    pub fn seed(&self, credits: i32) -> UserId {
        let id = UserId::new();
        let profile = Profile::new(id.clone(), credits, OffsetDateTime::now_utc());
        self.profiles.lock().unwrap().insert(id.clone(), profile);
        id
    }

    pub fn balance(&self, user_id: &UserId) -> Option<i32> {
        self.profiles.lock().unwrap().get(user_id).map(|p| p.credits)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn insert_reservation(&self, reservation: Reservation) {
        self.reservations
            .lock()
            .unwrap()
            .insert(reservation.id.clone(), reservation);
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.reservations.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ProfileStorePort for FakeLedger {
    async fn get_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn create_profile(&self, user_id: &UserId, initial_credits: i32) -> AppResult<Profile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id.clone())
            .or_insert_with(|| Profile::new(user_id.clone(), initial_credits, OffsetDateTime::now_utc()));
        Ok(profile.clone())
    }

    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: CreditAmount,
    ) -> AppResult<CreditOutcome> {
        let mut profiles = self.profiles.lock().unwrap();
        Ok(match profiles.get_mut(user_id) {
            Some(profile) => profile.deduct(amount, OffsetDateTime::now_utc()),
            None => Err(CreditError::UserNotFound),
        })
    }

    async fn add_credits(&self, user_id: &UserId, amount: CreditAmount) -> AppResult<CreditOutcome> {
        let mut profiles = self.profiles.lock().unwrap();
        Ok(match profiles.get_mut(user_id) {
            Some(profile) => profile.add(amount, OffsetDateTime::now_utc()),
            None => Err(CreditError::UserNotFound),
        })
    }
}

#[async_trait::async_trait]
impl ReservationStorePort for FakeLedger {
    async fn reserve(&self, reservation: &Reservation) -> AppResult<Result<i32, CreditError>> {
        let outcome = self
            .deduct_credits(&reservation.user_id, reservation.amount)
            .await?;
        if outcome.is_ok() {
            self.insert_reservation(reservation.clone());
        }
        Ok(outcome)
    }

    async fn confirm(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Reservation>> {
        let mut reservations = self.reservations.lock().unwrap();
        Ok(reservations.get_mut(id).and_then(|r| {
            r.settle(ReservationStatus::Confirmed, now)
                .then(|| r.clone())
        }))
    }

    async fn refund(
        &self,
        id: &ReservationId,
        now: OffsetDateTime,
    ) -> AppResult<Option<ReservationRefund>> {
        let pending = self
            .reservations
            .lock()
            .unwrap()
            .get(id)
            .filter(|r| r.is_pending())
            .cloned();
        let Some(mut reservation) = pending else {
            return Ok(None);
        };
        let new_balance = self
            .add_credits(&reservation.user_id, reservation.amount)
            .await?
            .map_err(AppError::from)?;
        reservation.settle(ReservationStatus::Refunded, now);
        self.reservations
            .lock()
            .unwrap()
            .insert(id.clone(), reservation.clone());
        Ok(Some(ReservationRefund {
            reservation,
            new_balance,
        }))
    }

    async fn get_reservation(&self, id: &ReservationId) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.lock().unwrap().get(id).cloned())
    }

    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: usize,
        exclude: &[ReservationId],
    ) -> AppResult<Vec<Reservation>> {
        let mut expired: Vec<_> = self
            .reservations
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_expired(now) && !exclude.contains(&r.id))
            .cloned()
            .collect();
        expired.sort_by_key(|r| r.expires_at);
        expired.truncate(limit);
        Ok(expired)
    }
}

pub struct FailingProfileStore;

fn storage_down() -> AppError {
    AppError::DatabaseError {
        message: "connection refused".to_string(),
    }
}

#[async_trait::async_trait]
impl ProfileStorePort for FailingProfileStore {
    async fn get_profile(&self, _user_id: &UserId) -> AppResult<Option<Profile>> {
        Ok(None)
    }

    async fn create_profile(&self, _user_id: &UserId, _initial: i32) -> AppResult<Profile> {
        Err(storage_down())
    }

    async fn deduct_credits(&self, _user_id: &UserId, _amount: CreditAmount) -> AppResult<CreditOutcome> {
        Err(storage_down())
    }

    async fn add_credits(&self, _user_id: &UserId, _amount: CreditAmount) -> AppResult<CreditOutcome> {
        Err(storage_down())
    }
}

/// Replays queued answers in order; `Err(())` simulates a transport failure.
#[derive(Default)]
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<Result<Option<String>, ()>>>,
    pub prompts: Mutex<Vec<ImagePrompt>>,
}

impl ScriptedGenerator {
    pub fn with(answers: impl IntoIterator<Item = Result<Option<String>, ()>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::default(),
        }
    }
}

#[async_trait::async_trait]
impl ImageGenerationPort for ScriptedGenerator {
    async fn generate(&self, prompt: &ImagePrompt) -> AppResult<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(())) | None => Err(AppError::ExternalServiceError {
                message: "model unavailable".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeUsers {
    users: Mutex<Vec<(UserPublic, String)>>,
}

#[async_trait::async_trait]
impl UserStorePort for FakeUsers {
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserPublic> {
        let user = UserPublic {
            id: UserId::new(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users
            .lock()
            .unwrap()
            .push((user.clone(), password_hash.to_string()));
        Ok(user)
    }

    async fn find_credentials_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                id: u.id.clone(),
                email: u.email.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserPublic>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.clone()))
    }

    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<UserPublic>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| &u.id == id)
            .map(|(u, _)| u.clone()))
    }
}

pub struct PlainHasher;

impl PasswordHasherPort for PlainHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, password_hash: &str) -> AppResult<bool> {
        Ok(password_hash == format!("plain:{password}"))
    }
}
