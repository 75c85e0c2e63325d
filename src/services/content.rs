use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::repository::NewContent;
use crate::datasource::{
    CategoryRepository, ContentRepository, StoreError, SubscriptionRepository,
};
use crate::errors::Error;
use crate::models::{Content, ContentKind, MediaAsset, MediaTrack};
use crate::services::access;
use crate::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(ContentKind),
    #[error("Missing fields are required")]
    MissingFields(Vec<&'static str>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContentInput {
    pub parent_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(url)]
    pub media_url: Option<String>,
}

/// What a subscriber needs to start an episode.
#[derive(Debug, Clone, Serialize)]
pub struct Playback {
    pub episode: Content,
    pub playback_id: String,
    pub stream_url: String,
    pub tracks: Vec<MediaTrack>,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

async fn find<S>(store: &S, kind: ContentKind, id: Uuid) -> Result<Option<Content>, StoreError>
where
    S: ContentRepository + ?Sized,
{
    Ok(store.content(id).await?.filter(|c| c.kind == kind))
}

async fn ensure_parent<S>(store: &S, content: &Content) -> Result<(), PublishError>
where
    S: ContentRepository + ?Sized,
{
    let Some(parent_kind) = content.kind.parent_kind() else {
        return Ok(());
    };
    let parent = match content.parent_id {
        Some(parent_id) => find(store, parent_kind, parent_id).await?,
        None => None,
    };
    parent
        .map(|_| ())
        .ok_or(PublishError::NotFound(parent_kind))
}

fn missing_fields(content: &Content) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if is_blank(&content.name) {
        missing.push("name");
    }
    if is_blank(&content.description) {
        missing.push("description");
    }
    if is_blank(&content.media_url) {
        missing.push("media_url");
    }
    missing
}

fn has_playable_media(content: &Content) -> bool {
    content
        .media_asset
        .as_ref()
        .is_some_and(|asset| !is_blank(&asset.playback_id))
}

#[instrument(skip(store, input), fields(actor = %actor.user_id))]
pub async fn create<S>(
    store: &S,
    actor: &Session,
    kind: ContentKind,
    input: ContentInput,
    now: DateTime<Utc>,
) -> Result<Content, Error>
where
    S: ContentRepository + CategoryRepository + ?Sized,
{
    actor.require_admin()?;
    input.validate()?;
    match (kind.parent_kind(), input.parent_id) {
        (None, Some(_)) => {
            return Err(Error::Validation(format!("{kind} cannot have a parent")));
        }
        (Some(parent_kind), parent_id) => {
            let parent = match parent_id {
                Some(parent_id) => find(store, parent_kind, parent_id).await?,
                None => None,
            };
            if parent.is_none() {
                return Err(Error::not_found(parent_kind));
            }
        }
        (None, None) => {}
    }
    if let Some(category_id) = input.category_id {
        if kind != ContentKind::Series {
            return Err(Error::Validation(
                "Only series can belong to a category".to_owned(),
            ));
        }
        if store.category(category_id).await?.is_none() {
            return Err(Error::not_found("Category"));
        }
    }
    let content = store
        .insert_content(&NewContent {
            id: Uuid::new_v4(),
            kind,
            parent_id: input.parent_id,
            category_id: input.category_id,
            name: input.name.trim().to_owned(),
            description: input.description.trim().to_owned(),
            media_url: input.media_url.unwrap_or_default().trim().to_owned(),
            created_at: now,
        })
        .await?;
    info!(id = %content.id, "created {kind}");
    Ok(content)
}

/// Unpublished entities are only visible to admins.
pub async fn get<S>(
    store: &S,
    viewer: Option<&Session>,
    kind: ContentKind,
    id: Uuid,
) -> Result<Content, Error>
where
    S: ContentRepository + ?Sized,
{
    let is_admin = viewer.is_some_and(Session::is_admin);
    find(store, kind, id)
        .await?
        .filter(|c| c.is_published || is_admin)
        .ok_or_else(|| Error::not_found(kind))
}

pub async fn children<S>(
    store: &S,
    viewer: Option<&Session>,
    kind: ContentKind,
    id: Uuid,
) -> Result<Vec<Content>, Error>
where
    S: ContentRepository + ?Sized,
{
    let parent = get(store, viewer, kind, id).await?;
    let is_admin = viewer.is_some_and(Session::is_admin);
    Ok(store.children(parent.id, !is_admin).await?)
}

/// Resolves `playback_id` at the video provider and stores the asset on the entity.
#[instrument(skip(store, media), fields(actor = %actor.user_id))]
pub async fn link_media<S>(
    store: &S,
    media: &mux::Client,
    actor: &Session,
    kind: ContentKind,
    id: Uuid,
    playback_id: &str,
    now: DateTime<Utc>,
) -> Result<Content, Error>
where
    S: ContentRepository + ?Sized,
{
    actor.require_admin()?;
    if !kind.is_video() {
        return Err(Error::Validation(format!("{kind} cannot have video media")));
    }
    let playback_id = playback_id.trim();
    if playback_id.is_empty() {
        return Err(Error::MissingFields(vec!["playback_id"]));
    }
    if find(store, kind, id).await?.is_none() {
        return Err(Error::not_found(kind));
    }
    let asset = media.asset_by_playback_id(playback_id).await?;
    let media_asset = MediaAsset {
        asset_id: asset.id,
        playback_id: playback_id.to_owned(),
        duration_seconds: asset.duration,
    };
    store
        .set_media_asset(id, &media_asset, now)
        .await?
        .ok_or_else(|| Error::not_found(kind))
}

/// Validates in order and stops at the first failure, nothing is written unless all pass.
#[instrument(skip(store), fields(actor = %actor.user_id))]
pub async fn publish<S>(
    store: &S,
    actor: &Session,
    kind: ContentKind,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Content, PublishError>
where
    S: ContentRepository + ?Sized,
{
    if !actor.is_admin() {
        return Err(PublishError::Unauthorized);
    }
    let content = find(store, kind, id)
        .await?
        .ok_or(PublishError::NotFound(kind))?;
    ensure_parent(store, &content).await?;
    let missing = missing_fields(&content);
    if !missing.is_empty() {
        return Err(PublishError::MissingFields(missing));
    }
    if kind.is_video() && !has_playable_media(&content) {
        return Err(PublishError::MissingFields(vec!["media_asset"]));
    }
    let published = store
        .set_published(id, Some(now), now)
        .await?
        .ok_or(PublishError::NotFound(kind))?;
    info!(%id, "published {kind}");
    Ok(published)
}

#[instrument(skip(store), fields(actor = %actor.user_id))]
pub async fn unpublish<S>(
    store: &S,
    actor: &Session,
    kind: ContentKind,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Content, PublishError>
where
    S: ContentRepository + ?Sized,
{
    if !actor.is_admin() {
        return Err(PublishError::Unauthorized);
    }
    let content = find(store, kind, id)
        .await?
        .ok_or(PublishError::NotFound(kind))?;
    ensure_parent(store, &content).await?;
    let unpublished = store
        .set_published(id, None, now)
        .await?
        .ok_or(PublishError::NotFound(kind))?;
    info!(%id, "unpublished {kind}");
    Ok(unpublished)
}

#[instrument(skip(store), fields(actor = %actor.user_id))]
pub async fn delete<S>(store: &S, actor: &Session, kind: ContentKind, id: Uuid) -> Result<(), Error>
where
    S: ContentRepository + ?Sized,
{
    actor.require_admin()?;
    if find(store, kind, id).await?.is_none() || !store.delete_content(id).await? {
        return Err(Error::not_found(kind));
    }
    info!(%id, "deleted {kind}");
    Ok(())
}

/// Gated on the viewer's subscription at the time of the call.
#[instrument(skip(store, media), fields(viewer = %viewer.user_id))]
pub async fn playback<S>(
    store: &S,
    media: &mux::Client,
    viewer: &Session,
    episode_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Playback, Error>
where
    S: ContentRepository + SubscriptionRepository + ?Sized,
{
    let episode = get(store, Some(viewer), ContentKind::Episode, episode_id).await?;
    if !access::has_active_access(store, viewer.user_id, now).await? {
        return Err(Error::Unauthorized(
            "An active subscription is required".to_owned(),
        ));
    }
    let playback_id = episode
        .media_asset
        .as_ref()
        .map(|asset| asset.playback_id.clone())
        .filter(|id| !is_blank(id))
        .ok_or_else(|| Error::NotFound("Episode has no playable media".to_owned()))?;
    let stream_url = media.stream_url(&playback_id)?.to_string();
    let tracks = store.tracks(episode.id).await?;
    Ok(Playback {
        episode,
        playback_id,
        stream_url,
        tracks,
    })
}
