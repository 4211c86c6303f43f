//! In-memory stores for tests/dev.
//!
//! Each store guards its rows with a single `RwLock`; locks are never held
//! across an `.await`, so unique-key checks and inserts happen atomically
//! under one write guard.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use profilehub_auth::AuthToken;
use profilehub_core::{Email, Entity, ProfileId};
use profilehub_feed::ProfileFeedItem;
use profilehub_profiles::UserProfile;

use super::{FeedRepository, ProfileRepository, Repository, StoreError, TokenRepository};

/// A field whose value must be unique across all rows.
struct UniqueKey<T> {
    field: &'static str,
    key: fn(&T) -> String,
}

/// Generic in-memory table keyed by entity id.
///
/// Rows are kept in a `BTreeMap`, so listing returns them in id order
/// (UUIDv7 ids make that creation order).
pub struct InMemoryRepository<T: Entity> {
    rows: RwLock<BTreeMap<T::Id, T>>,
    unique: Vec<UniqueKey<T>>,
}

pub type InMemoryProfileStore = InMemoryRepository<UserProfile>;
pub type InMemoryFeedStore = InMemoryRepository<ProfileFeedItem>;

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            unique: Vec::new(),
        }
    }

    fn with_unique(mut self, field: &'static str, key: fn(&T) -> String) -> Self {
        self.unique.push(UniqueKey { field, key });
        self
    }

    fn read<R>(&self, f: impl FnOnce(&BTreeMap<T::Id, T>) -> R) -> Result<R, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::backend("read", "lock poisoned"))?;
        Ok(f(&rows))
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<T::Id, T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::backend("write", "lock poisoned"))?;
        f(&mut rows)
    }

    fn check_unique(&self, rows: &BTreeMap<T::Id, T>, record: &T) -> Result<(), StoreError> {
        for constraint in &self.unique {
            let wanted = (constraint.key)(record);
            let taken = rows
                .values()
                .any(|other| other.id() != record.id() && (constraint.key)(other) == wanted);
            if taken {
                return Err(StoreError::Conflict(constraint.field));
            }
        }
        Ok(())
    }
}

impl InMemoryRepository<UserProfile> {
    /// Profile table with the unique email constraint.
    pub fn profiles() -> Self {
        Self::new().with_unique("email", |p| p.email().as_str().to_string())
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Entity + Clone + Send + Sync + 'static,
    T::Id: Send + Sync,
{
    async fn create(&self, record: T) -> Result<T, StoreError> {
        self.write(|rows| {
            if rows.contains_key(record.id()) {
                return Err(StoreError::Conflict("id"));
            }
            self.check_unique(rows, &record)?;
            rows.insert(*record.id(), record.clone());
            Ok(record)
        })
    }

    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        self.read(|rows| rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<T>, StoreError> {
        self.read(|rows| rows.values().cloned().collect())
    }

    async fn update(&self, record: T) -> Result<T, StoreError> {
        self.write(|rows| {
            if !rows.contains_key(record.id()) {
                return Err(StoreError::NotFound);
            }
            self.check_unique(rows, &record)?;
            rows.insert(*record.id(), record.clone());
            Ok(record)
        })
    }

    async fn delete(&self, id: T::Id) -> Result<bool, StoreError> {
        self.write(|rows| Ok(rows.remove(&id).is_some()))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository<UserProfile> {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserProfile>, StoreError> {
        self.read(|rows| rows.values().find(|p| p.email() == email).cloned())
    }
}

#[async_trait]
impl FeedRepository for InMemoryRepository<ProfileFeedItem> {
    async fn delete_by_owner(&self, owner: ProfileId) -> Result<u64, StoreError> {
        self.write(|rows| {
            let before = rows.len();
            rows.retain(|_, item| item.user_profile() != owner);
            Ok((before - rows.len()) as u64)
        })
    }
}

#[derive(Default)]
struct TokenTable {
    by_profile: HashMap<ProfileId, AuthToken>,
    by_token: HashMap<AuthToken, ProfileId>,
}

/// In-memory token store (one token per profile).
#[derive(Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<TokenTable>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenStore {
    async fn get_or_create(&self, profile_id: ProfileId) -> Result<AuthToken, StoreError> {
        let mut table = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("get_or_create_token", "lock poisoned"))?;
        if let Some(token) = table.by_profile.get(&profile_id) {
            return Ok(token.clone());
        }
        let token = AuthToken::generate();
        table.by_profile.insert(profile_id, token.clone());
        table.by_token.insert(token.clone(), profile_id);
        Ok(token)
    }

    async fn resolve(&self, token: &AuthToken) -> Result<Option<ProfileId>, StoreError> {
        let table = self
            .inner
            .read()
            .map_err(|_| StoreError::backend("resolve_token", "lock poisoned"))?;
        Ok(table.by_token.get(token).copied())
    }

    async fn revoke(&self, profile_id: ProfileId) -> Result<(), StoreError> {
        let mut table = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("revoke_token", "lock poisoned"))?;
        if let Some(token) = table.by_profile.remove(&profile_id) {
            table.by_token.remove(&token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use profilehub_feed::FeedItemInput;
    use profilehub_profiles::{ProfileInput, SearchQuery};

    fn profile(email: &str, name: &str) -> UserProfile {
        UserProfile::register(
            &ProfileInput {
                email: Some(email.to_string()),
                name: Some(name.to_string()),
                password: Some("pw".to_string()),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn item(owner: ProfileId, text: &str) -> ProfileFeedItem {
        ProfileFeedItem::post(
            owner,
            &FeedItemInput {
                status_text: Some(text.to_string()),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemoryProfileStore::profiles();
        let ada = store.create(profile("ada@example.com", "Ada")).await.unwrap();
        let loaded = store.get(*ada.id()).await.unwrap().unwrap();
        assert_eq!(loaded, ada);
        assert!(store.get(ProfileId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_is_unique_on_create_and_update() {
        let store = InMemoryProfileStore::profiles();
        store.create(profile("ada@example.com", "Ada")).await.unwrap();
        let err = store.create(profile("ada@example.com", "Other")).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict("email"));

        let mut bob = store.create(profile("bob@example.com", "Bob")).await.unwrap();
        let steal = ProfileInput {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        bob.apply(&steal, true).unwrap();
        assert_eq!(store.update(bob).await.unwrap_err(), StoreError::Conflict("email"));
    }

    #[tokio::test]
    async fn updating_own_row_keeps_email() {
        let store = InMemoryProfileStore::profiles();
        let mut ada = store.create(profile("ada@example.com", "Ada")).await.unwrap();
        ada.apply(&ProfileInput { name: Some("Ada L".to_string()), ..Default::default() }, true).unwrap();
        let saved = store.update(ada).await.unwrap();
        assert_eq!(saved.name(), "Ada L");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = InMemoryProfileStore::profiles();
        let err = store.update(profile("ghost@example.com", "Ghost")).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn find_by_email_and_search() {
        let store = InMemoryProfileStore::profiles();
        store.create(profile("ada@example.com", "Ada Lovelace")).await.unwrap();
        store.create(profile("grace@navy.mil", "Grace Hopper")).await.unwrap();

        let email = Email::parse("grace@navy.mil").unwrap();
        let grace = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(grace.name(), "Grace Hopper");

        let hits = store.search(&SearchQuery::parse("lovelace")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "Ada Lovelace");

        let all = store.search(&SearchQuery::parse("")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn list_returns_all_rows_and_delete_removes() {
        let store = InMemoryFeedStore::new();
        let owner = ProfileId::new();
        let first = store.create(item(owner, "one")).await.unwrap();
        let second = store.create(item(owner, "two")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first) && listed.contains(&second));

        assert!(store.delete(*first.id()).await.unwrap());
        assert!(!store.delete(*first.id()).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_owner_only_touches_that_owner() {
        let store = InMemoryFeedStore::new();
        let alice = ProfileId::new();
        let bob = ProfileId::new();
        store.create(item(alice, "a1")).await.unwrap();
        store.create(item(alice, "a2")).await.unwrap();
        store.create(item(bob, "b1")).await.unwrap();

        assert_eq!(store.delete_by_owner(alice).await.unwrap(), 2);
        let left = store.list().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].user_profile(), bob);
    }

    #[tokio::test]
    async fn tokens_are_stable_per_profile_and_resolvable() {
        let store = InMemoryTokenStore::new();
        let ada = ProfileId::new();
        let bob = ProfileId::new();

        let t1 = store.get_or_create(ada).await.unwrap();
        let t2 = store.get_or_create(ada).await.unwrap();
        let t3 = store.get_or_create(bob).await.unwrap();
        assert_eq!(t1, t2);
        assert_ne!(t1, t3);

        assert_eq!(store.resolve(&t1).await.unwrap(), Some(ada));
        assert_eq!(store.resolve(&AuthToken::new("nope")).await.unwrap(), None);

        store.revoke(ada).await.unwrap();
        assert_eq!(store.resolve(&t1).await.unwrap(), None);
    }
}
