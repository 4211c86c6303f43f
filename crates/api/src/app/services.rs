//! Application services: the operations behind each endpoint.
//!
//! Handlers stay thin; every permission check and store call goes through
//! `AppServices` so the same rules hold regardless of the HTTP surface.
//!
//! Mutations are two-step: `authorize_*` runs the policy pipeline and hands
//! back an [`Authorized`] value, and only that value unlocks the write. The
//! request body is decoded between the two steps, so callers who may not
//! touch a record never learn anything about their payload.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use profilehub_auth::{AuthToken, AuthzError, Operation, PasswordHash, Policies, Principal};
use profilehub_core::{DomainError, Email, Entity, FeedItemId, ProfileId};
use profilehub_feed::{FeedItemInput, ProfileFeedItem};
use profilehub_infra::store::{
    postgres, InMemoryFeedStore, InMemoryProfileStore, InMemoryTokenStore, PostgresFeedStore,
    PostgresProfileStore, PostgresTokenStore,
};
use profilehub_infra::{FeedRepository, ProfileRepository, Repository, StoreError, TokenRepository};
use profilehub_profiles::{ProfileInput, SearchQuery, UserProfile};

use crate::authz;
use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unable to log in with provided credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("profile is inactive")]
    InactiveProfile,

    #[error("blocking task failed: {0}")]
    Task(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A value that passed the policy pipeline for one operation.
///
/// Only `AppServices` constructs these.
#[derive(Debug)]
pub struct Authorized<T> {
    value: T,
    operation: Operation,
}

impl<T> Authorized<T> {
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    fn is_partial(&self) -> bool {
        self.operation == Operation::PartialUpdate
    }
}

/// Run CPU-heavy work (password hashing) off the async workers.
async fn blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
}

fn update_operation(partial: bool) -> Operation {
    if partial { Operation::PartialUpdate } else { Operation::Update }
}

#[derive(Clone)]
pub struct AppServices {
    profiles: Arc<dyn ProfileRepository>,
    feed: Arc<dyn FeedRepository>,
    tokens: Arc<dyn TokenRepository>,
    profile_policies: Policies<UserProfile>,
    feed_policies: Policies<ProfileFeedItem>,
}

impl AppServices {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        feed: Arc<dyn FeedRepository>,
        tokens: Arc<dyn TokenRepository>,
    ) -> Self {
        Self {
            profiles,
            feed,
            tokens,
            profile_policies: authz::profile_policies(),
            feed_policies: authz::feed_policies(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryProfileStore::profiles()),
            Arc::new(InMemoryFeedStore::new()),
            Arc::new(InMemoryTokenStore::new()),
        )
    }

    /// Connect to Postgres and make sure the schema exists.
    pub async fn postgres(database_url: &str) -> Result<Self, StoreError> {
        let pool = postgres::connect(database_url).await?;
        postgres::init_schema(&pool).await?;
        Ok(Self::new(
            Arc::new(PostgresProfileStore::new(pool.clone())),
            Arc::new(PostgresFeedStore::new(pool.clone())),
            Arc::new(PostgresTokenStore::new(pool)),
        ))
    }

    pub async fn from_config(config: &ApiConfig) -> Result<Self, StoreError> {
        // Build the dummy hash now so the first failed login is not cheaper.
        if tokio::task::spawn_blocking(|| PasswordHash::dummy().is_none())
            .await
            .unwrap_or(true)
        {
            tracing::warn!("dummy password hash unavailable");
        }

        match &config.database_url {
            Some(url) => {
                tracing::info!("using postgres stores");
                Self::postgres(url).await
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores");
                Ok(Self::in_memory())
            }
        }
    }

    // -------------------------
    // Authentication
    // -------------------------

    /// Exchange credentials for the profile's token, creating it on first use.
    ///
    /// Unknown and inactive accounts still pay for one hash verification.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthToken> {
        let password = password.to_string();
        let Ok(email) = Email::parse(email) else {
            blocking(move || Ok(PasswordHash::verify_dummy(&password))).await?;
            tracing::info!("login rejected: malformed email");
            return Err(ServiceError::InvalidCredentials);
        };

        let candidate = self.profiles.find_by_email(&email).await?;
        let profile = blocking(move || {
            Ok(match candidate {
                Some(p) if p.is_active() => p.check_password(&password).then_some(p),
                _ => {
                    PasswordHash::verify_dummy(&password);
                    None
                }
            })
        })
        .await?;

        let Some(profile) = profile else {
            tracing::info!(%email, "login rejected");
            return Err(ServiceError::InvalidCredentials);
        };

        let token = self.tokens.get_or_create(*profile.id()).await?;
        tracing::info!(%email, profile_id = %profile.id(), "login succeeded");
        Ok(token)
    }

    /// Resolve a presented token to the principal it authenticates.
    pub async fn authenticate(&self, token: &AuthToken) -> ServiceResult<Principal> {
        let profile_id = self
            .tokens
            .resolve(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;
        let profile = self
            .profiles
            .get(profile_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;
        if !profile.is_active() {
            return Err(ServiceError::InactiveProfile);
        }
        Ok(Principal::Profile(profile_id))
    }

    // -------------------------
    // Profiles
    // -------------------------

    pub async fn register_profile(
        &self,
        principal: Principal,
        input: &ProfileInput,
    ) -> ServiceResult<UserProfile> {
        self.profile_policies.check_request(&principal, Operation::Create)?;

        let input = input.clone();
        let profile = blocking(move || Ok(UserProfile::register(&input, Utc::now())?)).await?;
        let profile = self.profiles.create(profile).await?;
        tracing::info!(profile_id = %profile.id(), "profile registered");
        Ok(profile)
    }

    /// Create the bootstrap superuser unless a profile with that email exists.
    pub async fn ensure_superuser(&self, input: &ProfileInput) -> ServiceResult<UserProfile> {
        let email = Email::parse(input.email.as_deref().unwrap_or_default())
            .map_err(|msg| DomainError::field("email", msg))?;
        if let Some(existing) = self.profiles.find_by_email(&email).await? {
            tracing::info!(profile_id = %existing.id(), "superuser already present");
            return Ok(existing);
        }

        let input = input.clone();
        let profile = blocking(move || Ok(UserProfile::superuser(&input, Utc::now())?)).await?;
        let profile = self.profiles.create(profile).await?;
        tracing::info!(profile_id = %profile.id(), "superuser created");
        Ok(profile)
    }

    pub async fn list_profiles(
        &self,
        principal: Principal,
        search: Option<&str>,
    ) -> ServiceResult<Vec<UserProfile>> {
        self.profile_policies.check_request(&principal, Operation::List)?;

        let query = SearchQuery::parse(search.unwrap_or_default());
        let profiles = if query.is_empty() {
            self.profiles.list().await?
        } else {
            self.profiles.search(&query).await?
        };
        Ok(profiles)
    }

    pub async fn get_profile(&self, principal: Principal, id: ProfileId) -> ServiceResult<UserProfile> {
        self.load_profile(principal, id, Operation::Retrieve).await
    }

    /// First half of an update: the profile exists and the caller owns it.
    pub async fn authorize_profile_update(
        &self,
        principal: Principal,
        id: ProfileId,
        partial: bool,
    ) -> ServiceResult<Authorized<UserProfile>> {
        let operation = update_operation(partial);
        let value = self.load_profile(principal, id, operation).await?;
        Ok(Authorized { value, operation })
    }

    pub async fn update_profile(
        &self,
        target: Authorized<UserProfile>,
        input: &ProfileInput,
    ) -> ServiceResult<UserProfile> {
        let partial = target.is_partial();
        let operation = target.operation;
        let mut profile = target.value;
        let input = input.clone();

        let profile = blocking(move || {
            profile.apply(&input, partial)?;
            Ok(profile)
        })
        .await?;
        let profile = self.profiles.update(profile).await?;
        tracing::info!(profile_id = %profile.id(), %operation, "profile updated");
        Ok(profile)
    }

    /// Delete a profile together with its feed items and token.
    ///
    /// The profile goes first: if that fails nothing else has been touched.
    /// Postgres cascades on its own; the explicit cleanup covers stores that
    /// do not.
    pub async fn delete_profile(&self, principal: Principal, id: ProfileId) -> ServiceResult<()> {
        self.load_profile(principal, id, Operation::Destroy).await?;

        if !self.profiles.delete(id).await? {
            return Err(DomainError::not_found().into());
        }
        let removed_items = self.feed.delete_by_owner(id).await?;
        self.tokens.revoke(id).await?;
        tracing::info!(profile_id = %id, removed_items, "profile deleted");
        Ok(())
    }

    async fn load_profile(
        &self,
        principal: Principal,
        id: ProfileId,
        operation: Operation,
    ) -> ServiceResult<UserProfile> {
        self.profile_policies.check_request(&principal, operation)?;

        let profile = self
            .profiles
            .get(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        self.profile_policies.check_object(&principal, operation, &profile)?;
        Ok(profile)
    }

    // -------------------------
    // Feed
    // -------------------------

    /// First half of posting: yields the author, who is always the caller.
    pub fn authorize_feed_post(&self, principal: Principal) -> ServiceResult<Authorized<ProfileId>> {
        self.feed_policies.check_request(&principal, Operation::Create)?;
        let value = principal.profile_id().ok_or(AuthzError::NotAuthenticated)?;
        Ok(Authorized {
            value,
            operation: Operation::Create,
        })
    }

    pub async fn post_feed_item(
        &self,
        author: Authorized<ProfileId>,
        input: &FeedItemInput,
    ) -> ServiceResult<ProfileFeedItem> {
        let owner = author.value;
        let item = ProfileFeedItem::post(owner, input, Utc::now())?;
        let item = self.feed.create(item).await?;
        tracing::info!(item_id = %item.id(), profile_id = %owner, "feed item posted");
        Ok(item)
    }

    pub async fn list_feed(&self, principal: Principal) -> ServiceResult<Vec<ProfileFeedItem>> {
        self.feed_policies.check_request(&principal, Operation::List)?;
        Ok(self.feed.list().await?)
    }

    pub async fn get_feed_item(
        &self,
        principal: Principal,
        id: FeedItemId,
    ) -> ServiceResult<ProfileFeedItem> {
        self.load_feed_item(principal, id, Operation::Retrieve).await
    }

    /// First half of an update: the item exists and the caller wrote it.
    pub async fn authorize_feed_update(
        &self,
        principal: Principal,
        id: FeedItemId,
        partial: bool,
    ) -> ServiceResult<Authorized<ProfileFeedItem>> {
        let operation = update_operation(partial);
        let value = self.load_feed_item(principal, id, operation).await?;
        Ok(Authorized { value, operation })
    }

    pub async fn update_feed_item(
        &self,
        target: Authorized<ProfileFeedItem>,
        input: &FeedItemInput,
    ) -> ServiceResult<ProfileFeedItem> {
        let partial = target.is_partial();
        let operation = target.operation;
        let mut item = target.value;

        item.revise(input, partial)?;
        let item = self.feed.update(item).await?;
        tracing::info!(item_id = %item.id(), %operation, "feed item updated");
        Ok(item)
    }

    pub async fn delete_feed_item(&self, principal: Principal, id: FeedItemId) -> ServiceResult<()> {
        self.load_feed_item(principal, id, Operation::Destroy).await?;

        if !self.feed.delete(id).await? {
            return Err(DomainError::not_found().into());
        }
        tracing::info!(item_id = %id, "feed item deleted");
        Ok(())
    }

    async fn load_feed_item(
        &self,
        principal: Principal,
        id: FeedItemId,
        operation: Operation,
    ) -> ServiceResult<ProfileFeedItem> {
        self.feed_policies.check_request(&principal, operation)?;

        let item = self.feed.get(id).await?.ok_or(DomainError::NotFound)?;
        self.feed_policies.check_object(&principal, operation, &item)?;
        Ok(item)
    }
}
