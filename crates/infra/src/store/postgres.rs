//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict(field)` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! Unique email and cascade-on-delete are enforced by the schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use profilehub_auth::{AuthToken, PasswordHash};
use profilehub_core::{Email, Entity, FeedItemId, ProfileId};
use profilehub_feed::ProfileFeedItem;
use profilehub_profiles::UserProfile;

use super::{FeedRepository, ProfileRepository, Repository, StoreError, TokenRepository};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_profiles (
        id UUID PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        password TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT user_profiles_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profile_feed_items (
        id UUID PRIMARY KEY,
        user_profile UUID NOT NULL REFERENCES user_profiles (id) ON DELETE CASCADE,
        status_text VARCHAR(255) NOT NULL,
        created_on TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS profile_feed_items_user_profile_idx
        ON profile_feed_items (user_profile)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS auth_tokens (
        token VARCHAR(40) PRIMARY KEY,
        profile_id UUID NOT NULL UNIQUE REFERENCES user_profiles (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Create the tables if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("init_schema", e))?;
    }
    tracing::info!("database schema ready");
    Ok(())
}

pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPool::connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let field = match db_err.constraint() {
                    Some("user_profiles_email_key") => "email",
                    Some("auth_tokens_profile_id_key") => "profile_id",
                    _ => "id",
                };
                return StoreError::Conflict(field);
            }
            StoreError::backend(operation, db_err.message().to_string())
        }
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        other => StoreError::backend(operation, other.to_string()),
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::backend("decode_row", format!("{name}: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

const PROFILE_COLUMNS: &str =
    "id, email, name, password, is_active, is_staff, is_superuser, created_at";

fn profile_from_row(row: &PgRow) -> Result<UserProfile, StoreError> {
    let email: String = column(row, "email")?;
    let email = Email::parse(&email).map_err(|e| StoreError::backend("decode_row", format!("email: {e}")))?;
    let password: String = column(row, "password")?;
    let password =
        PasswordHash::from_phc(password).map_err(|e| StoreError::backend("decode_row", e.to_string()))?;

    Ok(UserProfile::from_parts(
        ProfileId::from_uuid(column::<Uuid>(row, "id")?),
        email,
        column(row, "name")?,
        password,
        column(row, "is_active")?,
        column(row, "is_staff")?,
        column(row, "is_superuser")?,
        column::<DateTime<Utc>>(row, "created_at")?,
    ))
}

pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<UserProfile> for PostgresProfileStore {
    #[instrument(skip_all, fields(profile_id = %record.id()))]
    async fn create(&self, record: UserProfile) -> Result<UserProfile, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                id, email, name, password, is_active, is_staff, is_superuser, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.email().as_str())
        .bind(record.name())
        .bind(record.password_hash().as_str())
        .bind(record.is_active())
        .bind(record.is_staff())
        .bind(record.is_superuser())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_profile", e))?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: ProfileId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_profile", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM user_profiles ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_profiles", e))?;
        rows.iter().map(profile_from_row).collect()
    }

    #[instrument(skip_all, fields(profile_id = %record.id()))]
    async fn update(&self, record: UserProfile) -> Result<UserProfile, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET email = $2, name = $3, password = $4, is_active = $5, is_staff = $6, is_superuser = $7
            WHERE id = $1
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.email().as_str())
        .bind(record.name())
        .bind(record.password_hash().as_str())
        .bind(record.is_active())
        .bind(record.is_staff())
        .bind(record.is_superuser())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_profile", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ProfileId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_profile", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileStore {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_profile_by_email", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed items
// ─────────────────────────────────────────────────────────────────────────────

fn feed_item_from_row(row: &PgRow) -> Result<ProfileFeedItem, StoreError> {
    Ok(ProfileFeedItem::from_parts(
        FeedItemId::from_uuid(column::<Uuid>(row, "id")?),
        ProfileId::from_uuid(column::<Uuid>(row, "user_profile")?),
        column(row, "status_text")?,
        column::<DateTime<Utc>>(row, "created_on")?,
    ))
}

pub struct PostgresFeedStore {
    pool: PgPool,
}

impl PostgresFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<ProfileFeedItem> for PostgresFeedStore {
    #[instrument(skip_all, fields(item_id = %record.id()))]
    async fn create(&self, record: ProfileFeedItem) -> Result<ProfileFeedItem, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profile_feed_items (id, user_profile, status_text, created_on)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.user_profile().as_uuid())
        .bind(record.status_text())
        .bind(record.created_on())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_feed_item", e))?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: FeedItemId) -> Result<Option<ProfileFeedItem>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_profile, status_text, created_on FROM profile_feed_items WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_feed_item", e))?;
        row.as_ref().map(feed_item_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<ProfileFeedItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_profile, status_text, created_on FROM profile_feed_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_feed_items", e))?;
        rows.iter().map(feed_item_from_row).collect()
    }

    /// Only the status text is written; owner and creation time are immutable.
    #[instrument(skip_all, fields(item_id = %record.id()))]
    async fn update(&self, record: ProfileFeedItem) -> Result<ProfileFeedItem, StoreError> {
        let result = sqlx::query("UPDATE profile_feed_items SET status_text = $2 WHERE id = $1")
            .bind(record.id().as_uuid())
            .bind(record.status_text())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_feed_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: FeedItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM profile_feed_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_feed_item", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedRepository for PostgresFeedStore {
    #[instrument(skip(self))]
    async fn delete_by_owner(&self, owner: ProfileId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM profile_feed_items WHERE user_profile = $1")
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_feed_items_by_owner", e))?;
        Ok(result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

pub struct PostgresTokenStore {
    pool: PgPool,
}

impl PostgresTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenStore {
    #[instrument(skip(self))]
    async fn get_or_create(&self, profile_id: ProfileId) -> Result<AuthToken, StoreError> {
        // Concurrent logins race on the unique profile_id; the loser keeps the winner's token.
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (token, profile_id)
            VALUES ($1, $2)
            ON CONFLICT (profile_id) DO NOTHING
            "#,
        )
        .bind(AuthToken::generate().as_str())
        .bind(profile_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_token", e))?;

        let row = sqlx::query("SELECT token FROM auth_tokens WHERE profile_id = $1")
            .bind(profile_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_token", e))?;
        Ok(AuthToken::new(column::<String>(&row, "token")?))
    }

    #[instrument(skip_all)]
    async fn resolve(&self, token: &AuthToken) -> Result<Option<ProfileId>, StoreError> {
        let row = sqlx::query("SELECT profile_id FROM auth_tokens WHERE token = $1")
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("resolve_token", e))?;
        row.as_ref()
            .map(|row| column::<Uuid>(row, "profile_id").map(ProfileId::from_uuid))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn revoke(&self, profile_id: ProfileId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM auth_tokens WHERE profile_id = $1")
            .bind(profile_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_token", e))?;
        Ok(())
    }
}
