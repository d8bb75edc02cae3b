use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;
use tracing::debug;

use domain::auth::{UserCredentials, UserId, UserPublic};
use wornshot_application::{
    error::{AppError, AppResult},
    ports::outgoing::user_store::UserStorePort,
};

#[derive(Debug, Clone)]
struct StoredUser {
    public: UserPublic,
    password_hash: String,
}

/// Users kept in process memory, for development and tests. Email and
/// username uniqueness is claimed through the index maps before the row is
/// written.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, StoredUser>,
    by_email: DashMap<String, UserId>,
    by_username: DashMap<String, UserId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn already_exists() -> AppError {
    AppError::ValidationError {
        message: "User with this email or username already exists".to_string(),
    }
}

#[async_trait::async_trait]
impl UserStorePort for MemoryUserStore {
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserPublic> {
        let id = UserId::new();

        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(already_exists()),
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }
        match self.by_username.entry(username.to_string()) {
            Entry::Occupied(_) => {
                self.by_email.remove(email);
                return Err(already_exists());
            }
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }

        let public = UserPublic {
            id: id.clone(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.insert(
            id,
            StoredUser {
                public: public.clone(),
                password_hash: password_hash.to_string(),
            },
        );

        debug!(user_id = %public.id, "Created in-memory user");
        Ok(public)
    }

    async fn find_credentials_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let Some(id) = self.by_email.get(email).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| UserCredentials {
            id: user.public.id.clone(),
            email: user.public.email.clone(),
            password_hash: user.password_hash.clone(),
        }))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserPublic>> {
        let Some(id) = self.by_username.get(username).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        self.find_user_by_id(&id).await
    }

    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<UserPublic>> {
        Ok(self.users.get(id).map(|user| user.public.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn email_and_username_are_unique() {
        let store = MemoryUserStore::new();
        store
            .create_user_with_password("a@b.co", "alice", "hash")
            .await
            .unwrap();

        assert!(store
            .create_user_with_password("a@b.co", "other", "hash")
            .await
            .is_err());
        assert!(store
            .create_user_with_password("c@d.co", "alice", "hash")
            .await
            .is_err());

        // the failed username claim must not leave its email reserved
        assert!(store
            .create_user_with_password("c@d.co", "carol", "hash")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn lookups_resolve_the_same_user() {
        let store = MemoryUserStore::new();
        let created = store
            .create_user_with_password("a@b.co", "alice", "hash")
            .await
            .unwrap();

        let creds = store.find_credentials_by_email("a@b.co").await.unwrap().unwrap();
        assert_eq!(creds.id, created.id);
        assert_eq!(creds.password_hash, "hash");

        let by_name = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
    }
}
