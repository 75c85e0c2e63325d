use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use uuid::Uuid;

use crate::datasource::repository::content::models::ContentEntity;
use crate::datasource::repository::{ContentRepository, NewContent};
use crate::datasource::{PgStore, Result};
use crate::models::{Content, MediaAsset, MediaTrack};

pub(super) mod models {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::models::{Content, ContentKind, MediaAsset};

    #[derive(Debug, sqlx::FromRow)]
    pub(in crate::datasource::repository) struct ContentEntity {
        pub id: Uuid,
        pub kind: ContentKind,
        pub parent_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub name: String,
        pub description: String,
        pub media_url: String,
        pub asset_id: Option<String>,
        pub playback_id: Option<String>,
        pub duration_seconds: Option<f64>,
        pub is_published: bool,
        pub published_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<ContentEntity> for Content {
        fn from(value: ContentEntity) -> Self {
            let media_asset = value
                .asset_id
                .zip(value.playback_id)
                .map(|(asset_id, playback_id)| MediaAsset {
                    asset_id,
                    playback_id,
                    duration_seconds: value.duration_seconds,
                });
            Self {
                id: value.id,
                kind: value.kind,
                parent_id: value.parent_id,
                category_id: value.category_id,
                name: value.name,
                description: value.description,
                media_url: value.media_url,
                media_asset,
                is_published: value.is_published,
                published_at: value.published_at,
                created_at: value.created_at,
                updated_at: value.updated_at,
            }
        }
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn insert_content(&self, content: &NewContent) -> Result<Content> {
        let record =
            sqlx::query_as::<_, ContentEntity>(include_str!("../../../queries/insert_content.sql"))
                .bind(content.id)
                .bind(content.kind)
                .bind(content.parent_id)
                .bind(content.category_id)
                .bind(&content.name)
                .bind(&content.description)
                .bind(&content.media_url)
                .bind(content.created_at)
                .fetch_one(self.pool())
                .await?;
        Ok(record.into())
    }

    async fn content(&self, id: Uuid) -> Result<Option<Content>> {
        let record = sqlx::query_as::<_, ContentEntity>(include_str!(
            "../../../queries/query_content_by_id.sql"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(record.map(Into::into))
    }

    async fn children(&self, parent_id: Uuid, published_only: bool) -> Result<Vec<Content>> {
        let query = sqlx::query_as::<_, ContentEntity>(include_str!(
            "../../../queries/query_content_children.sql"
        ))
        .bind(parent_id)
        .bind(published_only);
        let mut stream = query.fetch(self.pool());
        let mut children = Vec::new();
        while let Some(row) = stream.next().await {
            children.push(row?.into());
        }
        Ok(children)
    }

    async fn set_media_asset(
        &self,
        id: Uuid,
        asset: &MediaAsset,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>> {
        let record = sqlx::query_as::<_, ContentEntity>(include_str!(
            "../../../queries/update_content_media_asset.sql"
        ))
        .bind(id)
        .bind(&asset.asset_id)
        .bind(&asset.playback_id)
        .bind(asset.duration_seconds)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(record.map(Into::into))
    }

    async fn set_published(
        &self,
        id: Uuid,
        published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Content>> {
        let record = sqlx::query_as::<_, ContentEntity>(include_str!(
            "../../../queries/update_content_published.sql"
        ))
        .bind(id)
        .bind(published_at)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(record.map(Into::into))
    }

    async fn delete_content(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_content.sql"))
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_track(&self, track: &MediaTrack) -> Result<()> {
        sqlx::query(include_str!("../../../queries/insert_media_track.sql"))
            .bind(track.id)
            .bind(track.episode_id)
            .bind(track.kind)
            .bind(&track.language)
            .bind(&track.url)
            .bind(track.created_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn tracks(&self, episode_id: Uuid) -> Result<Vec<MediaTrack>> {
        let records =
            sqlx::query_as::<_, MediaTrack>(include_str!("../../../queries/query_media_tracks.sql"))
                .bind(episode_id)
                .fetch_all(self.pool())
                .await?;
        Ok(records)
    }
}
