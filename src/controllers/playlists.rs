use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::controllers::{created, data, ApiResult, Created};
use crate::errors::Error;
use crate::models::{Playlist, PlaylistItem, PlaylistWithItems};
use crate::services::playlists::{self, PlaylistInput, PlaylistItemInput};
use crate::session::Session;
use crate::state::SharedStore;

pub async fn list(session: Session, State(store): State<SharedStore>) -> ApiResult<Vec<PlaylistWithItems>> {
    Ok(data(playlists::list(&*store, session.user_id).await?))
}

pub async fn create(
    session: Session,
    State(store): State<SharedStore>,
    Json(input): Json<PlaylistInput>,
) -> Created<Playlist> {
    let playlist = playlists::create(&*store, session.user_id, input, Utc::now()).await?;
    Ok(created(playlist))
}

pub async fn delete(
    session: Session,
    Path(id): Path<Uuid>,
    State(store): State<SharedStore>,
) -> Result<StatusCode, Error> {
    playlists::delete(&*store, session.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_series(
    session: Session,
    Path(id): Path<Uuid>,
    State(store): State<SharedStore>,
    Json(input): Json<PlaylistItemInput>,
) -> Created<PlaylistItem> {
    let item =
        playlists::add_series(&*store, session.user_id, id, input.series_id, Utc::now()).await?;
    Ok(created(item))
}

pub async fn remove_series(
    session: Session,
    Path((id, series_id)): Path<(Uuid, Uuid)>,
    State(store): State<SharedStore>,
) -> Result<StatusCode, Error> {
    playlists::remove_series(&*store, session.user_id, id, series_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
