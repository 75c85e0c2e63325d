use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::controllers::{created, data, ApiResult, Created};
use crate::errors::Error;
use crate::models::{Content, ContentKind, MediaTrack, TrackKind};
use crate::services::content::{self, ContentInput, Playback};
use crate::services::uploads::{self, Upload};
use crate::session::Session;
use crate::state::{SharedBlobStore, SharedStore};

pub async fn create(
    session: Session,
    Path(kind): Path<ContentKind>,
    State(store): State<SharedStore>,
    Json(input): Json<ContentInput>,
) -> Created<Content> {
    let content = content::create(&*store, &session, kind, input, Utc::now()).await?;
    Ok(created(content))
}

pub async fn get(
    session: Option<Session>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
) -> ApiResult<Content> {
    Ok(data(content::get(&*store, session.as_ref(), kind, id).await?))
}

pub async fn children(
    session: Option<Session>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
) -> ApiResult<Vec<Content>> {
    Ok(data(
        content::children(&*store, session.as_ref(), kind, id).await?,
    ))
}

pub async fn delete(
    session: Session,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
) -> Result<StatusCode, Error> {
    content::delete(&*store, &session, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LinkMedia {
    pub playback_id: String,
}

pub async fn link_media(
    session: Session,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
    State(media): State<mux::Client>,
    Json(input): Json<LinkMedia>,
) -> ApiResult<Content> {
    let content = content::link_media(
        &*store,
        &media,
        &session,
        kind,
        id,
        &input.playback_id,
        Utc::now(),
    )
    .await?;
    Ok(data(content))
}

pub async fn publish(
    session: Session,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
) -> ApiResult<Content> {
    let content = content::publish(&*store, &session, kind, id, Utc::now()).await?;
    Ok(data(content))
}

pub async fn unpublish(
    session: Session,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    State(store): State<SharedStore>,
) -> ApiResult<Content> {
    let content = content::unpublish(&*store, &session, kind, id, Utc::now()).await?;
    Ok(data(content))
}

pub async fn playback(
    session: Session,
    Path(id): Path<Uuid>,
    State(store): State<SharedStore>,
    State(media): State<mux::Client>,
) -> ApiResult<Playback> {
    let playback = content::playback(&*store, &media, &session, id, Utc::now()).await?;
    Ok(data(playback))
}

fn multipart_error(err: &axum::extract::multipart::MultipartError) -> Error {
    Error::Validation(err.body_text())
}

/// Reads the `kind`, `language` and `file` parts of an upload form.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, Error> {
    let mut kind = None;
    let mut language = None;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(&err))?
    {
        match field.name() {
            Some("kind") => {
                let text = field.text().await.map_err(|err| multipart_error(&err))?;
                kind = Some(match text.trim() {
                    "audio" => TrackKind::Audio,
                    "subtitle" => TrackKind::Subtitle,
                    _ => return Err(Error::Validation("Invalid track kind".to_owned())),
                });
            }
            Some("language") => {
                language = Some(field.text().await.map_err(|err| multipart_error(&err))?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(|err| multipart_error(&err))?;
                file = Some((file_name, content_type, bytes));
            }
            _ => {}
        }
    }
    let mut missing = Vec::new();
    if kind.is_none() {
        missing.push("kind");
    }
    if language.is_none() {
        missing.push("language");
    }
    if file.is_none() {
        missing.push("file");
    }
    match (kind, language, file) {
        (Some(kind), Some(language), Some((file_name, content_type, data))) => Ok(Upload {
            kind,
            language,
            file_name,
            content_type,
            data,
        }),
        _ => Err(Error::MissingFields(missing)),
    }
}

pub async fn upload_track(
    session: Session,
    Path(id): Path<Uuid>,
    State(store): State<SharedStore>,
    State(blobs): State<SharedBlobStore>,
    multipart: Multipart,
) -> Created<MediaTrack> {
    session.require_admin()?;
    let upload = read_upload(multipart).await?;
    let track =
        uploads::attach_track(&*store, &*blobs, &session, id, upload, Utc::now()).await?;
    Ok(created(track))
}
