use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::Result;
use crate::models::{
    Category, Content, ContentKind, MediaAsset, MediaTrack, OneTimeToken, Playlist, PlaylistItem,
    Subscription, TokenPurpose, User, WatchHistoryRecord,
};

mod categories;
mod content;
mod playlists;
mod subscriptions;
mod tokens;
mod users;
mod watch_history;

#[derive(Debug, Clone)]
pub struct NewContent {
    pub id: Uuid,
    pub kind: ContentKind,
    pub parent_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`](crate::datasource::StoreError) when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<User>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool>;
    async fn update_password_hash(&self, email: &str, password_hash: &str) -> Result<bool>;
    async fn set_two_factor(&self, user_id: Uuid, enabled: bool) -> Result<bool>;
    async fn upsert_two_factor_confirmation(&self, user_id: Uuid, at: DateTime<Utc>)
        -> Result<()>;
    /// Removes the confirmation, returning whether one existed.
    async fn take_two_factor_confirmation(&self, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert_category(&self, category: &Category) -> Result<Category>;
    async fn categories(&self) -> Result<Vec<Category>>;
    async fn category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn series_in_category(&self, id: Uuid) -> Result<i64>;
    async fn delete_category(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn insert_content(&self, content: &NewContent) -> Result<Content>;
    async fn content(&self, id: Uuid) -> Result<Option<Content>>;
    async fn children(&self, parent_id: Uuid, published_only: bool) -> Result<Vec<Content>>;
    async fn set_media_asset(
        &self,
        id: Uuid,
        asset: &MediaAsset,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>>;
    /// `Some` publishes at the given instant, `None` unpublishes.
    async fn set_published(
        &self,
        id: Uuid,
        published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>>;
    /// Removes the entity and everything below it.
    async fn delete_content(&self, id: Uuid) -> Result<bool>;
    async fn insert_track(&self, track: &MediaTrack) -> Result<()>;
    async fn tracks(&self, episode_id: Uuid) -> Result<Vec<MediaTrack>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>>;
    async fn mark_cancel_at_period_end(
        &self,
        user_id: Uuid,
        canceled_at: DateTime<Utc>,
    ) -> Result<Option<Subscription>>;
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;
}

#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<Playlist>;
    async fn playlists_for_user(&self, user_id: Uuid) -> Result<Vec<Playlist>>;
    async fn playlist(&self, id: Uuid) -> Result<Option<Playlist>>;
    async fn delete_playlist(&self, id: Uuid) -> Result<bool>;
    /// Fails with [`StoreError::Conflict`](crate::datasource::StoreError) for a duplicate pair.
    async fn insert_playlist_item(&self, item: &PlaylistItem) -> Result<PlaylistItem>;
    async fn delete_playlist_item(&self, playlist_id: Uuid, series_id: Uuid) -> Result<bool>;
    async fn playlist_items(&self, playlist_id: Uuid) -> Result<Vec<PlaylistItem>>;
}

#[async_trait]
pub trait WatchHistoryRepository: Send + Sync {
    async fn upsert_progress(&self, record: &WatchHistoryRecord) -> Result<()>;
    async fn recent_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchHistoryRecord>>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Deletes any token for the same purpose and email, then stores `token`.
    async fn replace_token(&self, token: &OneTimeToken) -> Result<()>;
    async fn token_by_code(&self, purpose: TokenPurpose, code: &str)
        -> Result<Option<OneTimeToken>>;
    async fn delete_token(&self, id: Uuid) -> Result<bool>;
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}
