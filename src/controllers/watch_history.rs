use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::controllers::{data, ApiResult};
use crate::models::WatchHistoryRecord;
use crate::services::watch_history::{self, ProgressInput};
use crate::session::Session;
use crate::state::SharedStore;

pub async fn list(
    session: Session,
    State(store): State<SharedStore>,
) -> ApiResult<Vec<WatchHistoryRecord>> {
    Ok(data(watch_history::history(&*store, session.user_id).await?))
}

pub async fn record(
    session: Session,
    State(store): State<SharedStore>,
    Json(input): Json<ProgressInput>,
) -> ApiResult<WatchHistoryRecord> {
    let record =
        watch_history::record_progress(&*store, session.user_id, input, Utc::now()).await?;
    Ok(data(record))
}
