use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::{ContentRepository, PlaylistRepository, StoreError};
use crate::errors::Error;
use crate::models::{ContentKind, Playlist, PlaylistItem, PlaylistWithItems};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaylistInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemInput {
    pub series_id: Uuid,
}

/// Someone else's playlist is reported exactly like a missing one.
async fn owned<S>(store: &S, user_id: Uuid, playlist_id: Uuid) -> Result<Playlist, Error>
where
    S: PlaylistRepository + ?Sized,
{
    store
        .playlist(playlist_id)
        .await?
        .filter(|p| p.user_id == user_id)
        .ok_or_else(|| Error::not_found("Playlist"))
}

#[instrument(skip(store, input))]
pub async fn create<S>(
    store: &S,
    user_id: Uuid,
    input: PlaylistInput,
    now: DateTime<Utc>,
) -> Result<Playlist, Error>
where
    S: PlaylistRepository + ?Sized,
{
    input.validate()?;
    let playlist = Playlist {
        id: Uuid::new_v4(),
        user_id,
        name: input.name.trim().to_owned(),
        created_at: now,
    };
    Ok(store.insert_playlist(&playlist).await?)
}

pub async fn list<S>(store: &S, user_id: Uuid) -> Result<Vec<PlaylistWithItems>, Error>
where
    S: PlaylistRepository + ?Sized,
{
    let playlists = store.playlists_for_user(user_id).await?;
    let mut result = Vec::with_capacity(playlists.len());
    for playlist in playlists {
        let items = store.playlist_items(playlist.id).await?;
        result.push(PlaylistWithItems { playlist, items });
    }
    Ok(result)
}

#[instrument(skip(store))]
pub async fn delete<S>(store: &S, user_id: Uuid, playlist_id: Uuid) -> Result<(), Error>
where
    S: PlaylistRepository + ?Sized,
{
    let playlist = owned(store, user_id, playlist_id).await?;
    store.delete_playlist(playlist.id).await?;
    info!("deleted playlist");
    Ok(())
}

/// The unique (playlist, series) key decides duplicates, concurrent adds yield one row.
#[instrument(skip(store))]
pub async fn add_series<S>(
    store: &S,
    user_id: Uuid,
    playlist_id: Uuid,
    series_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PlaylistItem, Error>
where
    S: PlaylistRepository + ContentRepository + ?Sized,
{
    let playlist = owned(store, user_id, playlist_id).await?;
    let series = store
        .content(series_id)
        .await?
        .filter(|c| c.kind == ContentKind::Series);
    if series.is_none() {
        return Err(Error::not_found(ContentKind::Series));
    }
    let item = PlaylistItem {
        playlist_id: playlist.id,
        series_id,
        added_at: now,
    };
    match store.insert_playlist_item(&item).await {
        Ok(item) => Ok(item),
        Err(StoreError::Conflict) => Err(Error::Conflict(
            "This item is already in the playlist".to_owned(),
        )),
        Err(err) => Err(err.into()),
    }
}

#[instrument(skip(store))]
pub async fn remove_series<S>(
    store: &S,
    user_id: Uuid,
    playlist_id: Uuid,
    series_id: Uuid,
) -> Result<(), Error>
where
    S: PlaylistRepository + ?Sized,
{
    let playlist = owned(store, user_id, playlist_id).await?;
    if !store.delete_playlist_item(playlist.id, series_id).await? {
        return Err(Error::NotFound("Item is not in the playlist".to_owned()));
    }
    Ok(())
}
