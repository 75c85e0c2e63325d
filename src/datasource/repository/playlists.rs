use async_trait::async_trait;
use uuid::Uuid;

use crate::datasource::repository::PlaylistRepository;
use crate::datasource::{PgStore, Result};
use crate::models::{Playlist, PlaylistItem};

#[async_trait]
impl PlaylistRepository for PgStore {
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        let record =
            sqlx::query_as::<_, Playlist>(include_str!("../../../queries/insert_playlist.sql"))
                .bind(playlist.id)
                .bind(playlist.user_id)
                .bind(&playlist.name)
                .bind(playlist.created_at)
                .fetch_one(self.pool())
                .await?;
        Ok(record)
    }

    async fn playlists_for_user(&self, user_id: Uuid) -> Result<Vec<Playlist>> {
        let records = sqlx::query_as::<_, Playlist>(include_str!(
            "../../../queries/query_playlists_by_user.sql"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }

    async fn playlist(&self, id: Uuid) -> Result<Option<Playlist>> {
        let record =
            sqlx::query_as::<_, Playlist>(include_str!("../../../queries/query_playlist_by_id.sql"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    async fn delete_playlist(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_playlist.sql"))
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_playlist_item(&self, item: &PlaylistItem) -> Result<PlaylistItem> {
        let record = sqlx::query_as::<_, PlaylistItem>(include_str!(
            "../../../queries/insert_playlist_content.sql"
        ))
        .bind(item.playlist_id)
        .bind(item.series_id)
        .bind(item.added_at)
        .fetch_one(self.pool())
        .await?;
        Ok(record)
    }

    async fn delete_playlist_item(&self, playlist_id: Uuid, series_id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_playlist_content.sql"))
            .bind(playlist_id)
            .bind(series_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn playlist_items(&self, playlist_id: Uuid) -> Result<Vec<PlaylistItem>> {
        let records = sqlx::query_as::<_, PlaylistItem>(include_str!(
            "../../../queries/query_playlist_content.sql"
        ))
        .bind(playlist_id)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }
}
