//! Repository interfaces for persisted records.
//!
//! Services only ever talk to these traits; the concrete backend (in-memory
//! or Postgres) is chosen at startup.

use async_trait::async_trait;
use thiserror::Error;

use profilehub_auth::AuthToken;
use profilehub_core::{Email, Entity, ProfileId};
use profilehub_feed::ProfileFeedItem;
use profilehub_profiles::{SearchQuery, UserProfile};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryFeedStore, InMemoryProfileStore, InMemoryRepository, InMemoryTokenStore};
pub use postgres::{PostgresFeedStore, PostgresProfileStore, PostgresTokenStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint on the named field was violated.
    #[error("unique constraint violated on {0}")]
    Conflict(&'static str),

    #[error("record not found")]
    NotFound,

    #[error("store failure in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

/// CRUD over one entity type.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Entity + Send + Sync + 'static,
{
    async fn create(&self, record: T) -> Result<T, StoreError>;

    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<T>, StoreError>;

    /// Replace an existing record. `NotFound` if it does not exist.
    async fn update(&self, record: T) -> Result<T, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: T::Id) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProfileRepository: Repository<UserProfile> {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserProfile>, StoreError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<UserProfile>, StoreError> {
        let all = self.list().await?;
        Ok(all.into_iter().filter(|p| p.matches(query)).collect())
    }
}

#[async_trait]
pub trait FeedRepository: Repository<ProfileFeedItem> {
    /// Remove every item posted by `owner`; returns how many were removed.
    async fn delete_by_owner(&self, owner: ProfileId) -> Result<u64, StoreError>;
}

/// One token per profile; tokens never expire.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Return the profile's token, creating it on first use.
    async fn get_or_create(&self, profile_id: ProfileId) -> Result<AuthToken, StoreError>;

    async fn resolve(&self, token: &AuthToken) -> Result<Option<ProfileId>, StoreError>;

    async fn revoke(&self, profile_id: ProfileId) -> Result<(), StoreError>;
}
