use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::datasource::{ContentRepository, WatchHistoryRepository};
use crate::errors::Error;
use crate::models::{ContentKind, WatchHistoryRecord};

pub const HISTORY_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressInput {
    pub series_id: Uuid,
    pub episode_id: Uuid,
    pub position_seconds: f64,
}

/// Upserts the position for the (user, series, episode) triple.
#[instrument(skip(store))]
pub async fn record_progress<S>(
    store: &S,
    user_id: Uuid,
    input: ProgressInput,
    now: DateTime<Utc>,
) -> Result<WatchHistoryRecord, Error>
where
    S: WatchHistoryRepository + ContentRepository + ?Sized,
{
    if !input.position_seconds.is_finite() || input.position_seconds < 0.0 {
        return Err(Error::Validation(
            "Position must be a non-negative number of seconds".to_owned(),
        ));
    }
    let episode = store
        .content(input.episode_id)
        .await?
        .filter(|c| c.kind == ContentKind::Episode)
        .ok_or_else(|| Error::not_found(ContentKind::Episode))?;
    let season = match episode.parent_id {
        Some(season_id) => store.content(season_id).await?,
        None => None,
    };
    if season.and_then(|s| s.parent_id) != Some(input.series_id) {
        return Err(Error::Validation(
            "Episode does not belong to the series".to_owned(),
        ));
    }
    let record = WatchHistoryRecord {
        user_id,
        series_id: input.series_id,
        episode_id: input.episode_id,
        position_seconds: input.position_seconds,
        last_watched_at: now,
    };
    store.upsert_progress(&record).await?;
    Ok(record)
}

/// Most recently watched first, at most [`HISTORY_PAGE_SIZE`] entries.
pub async fn history<S>(store: &S, user_id: Uuid) -> Result<Vec<WatchHistoryRecord>, Error>
where
    S: WatchHistoryRepository + ?Sized,
{
    Ok(store.recent_history(user_id, HISTORY_PAGE_SIZE).await?)
}
