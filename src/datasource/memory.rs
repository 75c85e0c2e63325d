use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::RandomState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::repository::{
    CategoryRepository, ContentRepository, NewContent, PlaylistRepository,
    SubscriptionRepository, TokenRepository, UserRepository, WatchHistoryRepository,
};
use crate::datasource::{Result, StoreError};
use crate::models::{
    Category, Content, ContentKind, MediaAsset, MediaTrack, OneTimeToken, Playlist, PlaylistItem,
    Subscription, TokenPurpose, User, WatchHistoryRecord,
};

type Map<K, V> = HashMap<K, V, RandomState>;

#[derive(Debug, Default)]
struct Tables {
    users: Map<Uuid, User>,
    two_factor_confirmations: Map<Uuid, DateTime<Utc>>,
    categories: Map<Uuid, Category>,
    content: Map<Uuid, Content>,
    tracks: Vec<MediaTrack>,
    subscriptions: Map<Uuid, Subscription>,
    playlists: Map<Uuid, Playlist>,
    playlist_items: Vec<PlaylistItem>,
    watch_history: Map<(Uuid, Uuid, Uuid), WatchHistoryRecord>,
    tokens: Map<Uuid, OneTimeToken>,
}

impl Tables {
    fn descendants(&self, root: Uuid) -> Vec<Uuid> {
        let mut found = vec![root];
        let mut index = 0;
        while index < found.len() {
            let parent = found[index];
            found.extend(
                self.content
                    .values()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            index += 1;
        }
        found
    }
}

/// Store kept entirely in process memory, mirroring the constraints of the
/// relational schema (unique keys, cascading deletes, restricted category deletes).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("RWLock should never be poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("RWLock should never be poisoned")
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<User> {
        let mut tables = self.write();
        if tables
            .users
            .values()
            .any(|u| u.id == user.id || same_email(&u.email, &user.email))
        {
            return Err(StoreError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.read();
        Ok(tables
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.write();
        match tables
            .users
            .values_mut()
            .find(|u| same_email(&u.email, email))
        {
            Some(user) => {
                user.email_verified_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_password_hash(&self, email: &str, password_hash: &str) -> Result<bool> {
        let mut tables = self.write();
        match tables
            .users
            .values_mut()
            .find(|u| same_email(&u.email, email))
        {
            Some(user) => {
                password_hash.clone_into(&mut user.password_hash);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_two_factor(&self, user_id: Uuid, enabled: bool) -> Result<bool> {
        let mut tables = self.write();
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.two_factor_enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_two_factor_confirmation(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.write();
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Referenced);
        }
        tables.two_factor_confirmations.insert(user_id, at);
        Ok(())
    }

    async fn take_two_factor_confirmation(&self, user_id: Uuid) -> Result<bool> {
        Ok(self
            .write()
            .two_factor_confirmations
            .remove(&user_id)
            .is_some())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<Category> {
        let mut tables = self.write();
        if tables
            .categories
            .values()
            .any(|c| c.id == category.id || c.name == category.name)
        {
            return Err(StoreError::Conflict);
        }
        tables.categories.insert(category.id, category.clone());
        Ok(category.clone())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self.read().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.read().categories.get(&id).cloned())
    }

    async fn series_in_category(&self, id: Uuid) -> Result<i64> {
        let count = self
            .read()
            .content
            .values()
            .filter(|c| c.kind == ContentKind::Series && c.category_id == Some(id))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        if tables.content.values().any(|c| c.category_id == Some(id)) {
            return Err(StoreError::Referenced);
        }
        Ok(tables.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn insert_content(&self, content: &NewContent) -> Result<Content> {
        let mut tables = self.write();
        if tables.content.contains_key(&content.id) {
            return Err(StoreError::Conflict);
        }
        let parent_missing = content
            .parent_id
            .is_some_and(|id| !tables.content.contains_key(&id));
        let category_missing = content
            .category_id
            .is_some_and(|id| !tables.categories.contains_key(&id));
        if parent_missing || category_missing {
            return Err(StoreError::Referenced);
        }
        let record = Content {
            id: content.id,
            kind: content.kind,
            parent_id: content.parent_id,
            category_id: content.category_id,
            name: content.name.clone(),
            description: content.description.clone(),
            media_url: content.media_url.clone(),
            media_asset: None,
            is_published: false,
            published_at: None,
            created_at: content.created_at,
            updated_at: content.created_at,
        };
        tables.content.insert(record.id, record.clone());
        Ok(record)
    }

    async fn content(&self, id: Uuid) -> Result<Option<Content>> {
        Ok(self.read().content.get(&id).cloned())
    }

    async fn children(&self, parent_id: Uuid, published_only: bool) -> Result<Vec<Content>> {
        let mut children: Vec<_> = self
            .read()
            .content
            .values()
            .filter(|c| c.parent_id == Some(parent_id) && (!published_only || c.is_published))
            .cloned()
            .collect();
        children.sort_by_key(|c| (c.kind as u8, c.created_at));
        Ok(children)
    }

    async fn set_media_asset(
        &self,
        id: Uuid,
        asset: &MediaAsset,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>> {
        let mut tables = self.write();
        Ok(tables.content.get_mut(&id).map(|content| {
            content.media_asset = Some(asset.clone());
            content.updated_at = now;
            content.clone()
        }))
    }

    async fn set_published(
        &self,
        id: Uuid,
        published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>> {
        let mut tables = self.write();
        Ok(tables.content.get_mut(&id).map(|content| {
            content.is_published = published_at.is_some();
            content.published_at = published_at;
            content.updated_at = now;
            content.clone()
        }))
    }

    async fn delete_content(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        if !tables.content.contains_key(&id) {
            return Ok(false);
        }
        let removed = tables.descendants(id);
        for id in &removed {
            tables.content.remove(id);
        }
        tables.tracks.retain(|t| !removed.contains(&t.episode_id));
        tables
            .playlist_items
            .retain(|i| !removed.contains(&i.series_id));
        tables
            .watch_history
            .retain(|_, r| !removed.contains(&r.series_id) && !removed.contains(&r.episode_id));
        Ok(true)
    }

    async fn insert_track(&self, track: &MediaTrack) -> Result<()> {
        let mut tables = self.write();
        if !tables.content.contains_key(&track.episode_id) {
            return Err(StoreError::Referenced);
        }
        tables.tracks.push(track.clone());
        Ok(())
    }

    async fn tracks(&self, episode_id: Uuid) -> Result<Vec<MediaTrack>> {
        Ok(self
            .read()
            .tracks
            .iter()
            .filter(|t| t.episode_id == episode_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        Ok(self.read().subscriptions.get(&user_id).cloned())
    }

    async fn mark_cancel_at_period_end(
        &self,
        user_id: Uuid,
        canceled_at: DateTime<Utc>,
    ) -> Result<Option<Subscription>> {
        let mut tables = self.write();
        Ok(tables.subscriptions.get_mut(&user_id).map(|subscription| {
            subscription.cancel_at_period_end = true;
            subscription.canceled_at = Some(canceled_at);
            subscription.clone()
        }))
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.write()
            .subscriptions
            .insert(subscription.user_id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl PlaylistRepository for MemoryStore {
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        let mut tables = self.write();
        if tables.playlists.contains_key(&playlist.id) {
            return Err(StoreError::Conflict);
        }
        tables.playlists.insert(playlist.id, playlist.clone());
        Ok(playlist.clone())
    }

    async fn playlists_for_user(&self, user_id: Uuid) -> Result<Vec<Playlist>> {
        let mut playlists: Vec<_> = self
            .read()
            .playlists
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(playlists)
    }

    async fn playlist(&self, id: Uuid) -> Result<Option<Playlist>> {
        Ok(self.read().playlists.get(&id).cloned())
    }

    async fn delete_playlist(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        tables.playlist_items.retain(|i| i.playlist_id != id);
        Ok(tables.playlists.remove(&id).is_some())
    }

    async fn insert_playlist_item(&self, item: &PlaylistItem) -> Result<PlaylistItem> {
        let mut tables = self.write();
        if !tables.playlists.contains_key(&item.playlist_id)
            || !tables.content.contains_key(&item.series_id)
        {
            return Err(StoreError::Referenced);
        }
        if tables
            .playlist_items
            .iter()
            .any(|i| i.playlist_id == item.playlist_id && i.series_id == item.series_id)
        {
            return Err(StoreError::Conflict);
        }
        tables.playlist_items.push(item.clone());
        Ok(item.clone())
    }

    async fn delete_playlist_item(&self, playlist_id: Uuid, series_id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.playlist_items.len();
        tables
            .playlist_items
            .retain(|i| !(i.playlist_id == playlist_id && i.series_id == series_id));
        Ok(tables.playlist_items.len() != before)
    }

    async fn playlist_items(&self, playlist_id: Uuid) -> Result<Vec<PlaylistItem>> {
        Ok(self
            .read()
            .playlist_items
            .iter()
            .filter(|i| i.playlist_id == playlist_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WatchHistoryRepository for MemoryStore {
    async fn upsert_progress(&self, record: &WatchHistoryRecord) -> Result<()> {
        let key = (record.user_id, record.series_id, record.episode_id);
        self.write().watch_history.insert(key, record.clone());
        Ok(())
    }

    async fn recent_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchHistoryRecord>> {
        let mut records: Vec<_> = self
            .read()
            .watch_history
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn replace_token(&self, token: &OneTimeToken) -> Result<()> {
        let mut tables = self.write();
        tables
            .tokens
            .retain(|_, t| !(t.purpose == token.purpose && same_email(&t.email, &token.email)));
        if tables
            .tokens
            .values()
            .any(|t| t.purpose == token.purpose && t.code == token.code)
        {
            return Err(StoreError::Conflict);
        }
        tables.tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn token_by_code(
        &self,
        purpose: TokenPurpose,
        code: &str,
    ) -> Result<Option<OneTimeToken>> {
        Ok(self
            .read()
            .tokens
            .values()
            .find(|t| t.purpose == purpose && t.code == code)
            .cloned())
    }

    async fn delete_token(&self, id: Uuid) -> Result<bool> {
        Ok(self.write().tokens.remove(&id).is_some())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.write();
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::Role;

    fn series(id: Uuid, category_id: Option<Uuid>) -> NewContent {
        NewContent {
            id,
            kind: ContentKind::Series,
            parent_id: None,
            category_id,
            name: "Series".into(),
            description: String::new(),
            media_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicate_email_case_insensitively() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            name: "User".into(),
            password_hash: String::new(),
            role: Role::User,
            email_verified_at: None,
            two_factor_enabled: false,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();
        let duplicate = User {
            id: Uuid::new_v4(),
            email: "USER@example.com".into(),
            ..user
        };
        assert!(matches!(
            store.insert_user(&duplicate).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_delete_content_cascades_to_descendants() {
        let store = MemoryStore::new();
        let series_id = Uuid::new_v4();
        store.insert_content(&series(series_id, None)).await.unwrap();
        let season_id = Uuid::new_v4();
        store
            .insert_content(&NewContent {
                id: season_id,
                kind: ContentKind::Season,
                parent_id: Some(series_id),
                ..series(season_id, None)
            })
            .await
            .unwrap();
        let episode_id = Uuid::new_v4();
        store
            .insert_content(&NewContent {
                id: episode_id,
                kind: ContentKind::Episode,
                parent_id: Some(season_id),
                ..series(episode_id, None)
            })
            .await
            .unwrap();

        assert!(store.delete_content(series_id).await.unwrap());
        assert!(store.content(season_id).await.unwrap().is_none());
        assert!(store.content(episode_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_referenced_category_cannot_be_deleted() {
        let store = MemoryStore::new();
        let category = Category {
            id: Uuid::new_v4(),
            name: "Drama".into(),
            created_at: Utc::now(),
        };
        store.insert_category(&category).await.unwrap();
        store
            .insert_content(&series(Uuid::new_v4(), Some(category.id)))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_category(category.id).await,
            Err(StoreError::Referenced)
        ));
    }

    #[tokio::test]
    async fn test_delete_expired_tokens_keeps_live_ones() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (email, code, offset) in [("a@x.io", "111111", -1), ("b@x.io", "222222", 1)] {
            store
                .replace_token(&OneTimeToken {
                    id: Uuid::new_v4(),
                    purpose: TokenPurpose::Verification,
                    email: email.into(),
                    code: code.into(),
                    expires_at: now + Duration::minutes(offset),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.delete_expired_tokens(now).await.unwrap(), 1);
        assert!(store
            .token_by_code(TokenPurpose::Verification, "222222")
            .await
            .unwrap()
            .is_some());
    }
}
