use axum::extract::State;
use chrono::Utc;

use crate::controllers::{data, ApiResult};
use crate::models::Subscription;
use crate::services::access::{self, AccessSummary};
use crate::session::Session;
use crate::state::SharedStore;

pub async fn get(session: Session, State(store): State<SharedStore>) -> ApiResult<AccessSummary> {
    Ok(data(
        access::summary(&*store, session.user_id, Utc::now()).await?,
    ))
}

pub async fn cancel(session: Session, State(store): State<SharedStore>) -> ApiResult<Subscription> {
    Ok(data(
        access::cancel(&*store, session.user_id, Utc::now()).await?,
    ))
}
