use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use crate::datasource::repository::WatchHistoryRepository;
use crate::datasource::{PgStore, Result};
use crate::models::WatchHistoryRecord;

#[async_trait]
impl WatchHistoryRepository for PgStore {
    async fn upsert_progress(&self, record: &WatchHistoryRecord) -> Result<()> {
        sqlx::query(include_str!("../../../queries/upsert_watch_history.sql"))
            .bind(record.user_id)
            .bind(record.series_id)
            .bind(record.episode_id)
            .bind(record.position_seconds)
            .bind(record.last_watched_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn recent_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchHistoryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = sqlx::query_as::<_, WatchHistoryRecord>(include_str!(
            "../../../queries/query_watch_history_recent.sql"
        ))
        .bind(user_id)
        .bind(limit);
        let mut stream = query.fetch(self.pool());
        let mut records = Vec::new();
        while let Some(row) = stream.next().await {
            records.push(row?);
        }
        Ok(records)
    }
}
