use axum::body::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::datasource::ContentRepository;
use crate::errors::Error;
use crate::models::{ContentKind, MediaTrack, TrackKind};
use crate::session::Session;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const AUDIO_TYPES: &[&str] = &["audio/mpeg", "audio/mp4", "audio/aac", "audio/wav", "audio/ogg"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "ogg"];
const SUBTITLE_TYPES: &[&str] = &["text/vtt", "application/x-subrip", "text/plain"];
const SUBTITLE_EXTENSIONS: &[&str] = &["vtt", "srt"];

#[derive(Debug, Clone)]
pub struct Upload {
    pub kind: TrackKind,
    pub language: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

fn allowed(kind: TrackKind) -> (&'static [&'static str], &'static [&'static str]) {
    match kind {
        TrackKind::Audio => (AUDIO_TYPES, AUDIO_EXTENSIONS),
        TrackKind::Subtitle => (SUBTITLE_TYPES, SUBTITLE_EXTENSIONS),
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    (!stem.is_empty()).then(|| extension.to_ascii_lowercase())
}

/// Returns the normalized extension when both the MIME type and the extension are allowed for `kind`.
pub fn check_file(kind: TrackKind, file_name: &str, content_type: &str) -> Result<String, Error> {
    let (types, extensions) = allowed(kind);
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !types.contains(&mime.as_str()) {
        return Err(Error::Validation(format!(
            "Unsupported content type {mime} for {kind:?} track"
        )));
    }
    match extension(file_name) {
        Some(ext) if extensions.contains(&ext.as_str()) => Ok(ext),
        _ => Err(Error::Validation(format!(
            "Unsupported file extension for {kind:?} track"
        ))),
    }
}

/// Stores the file and records the track on the episode.
#[instrument(skip(store, blobs, upload), fields(actor = %actor.user_id, size = upload.data.len()))]
pub async fn attach_track<S>(
    store: &S,
    blobs: &dyn BlobStore,
    actor: &Session,
    episode_id: Uuid,
    upload: Upload,
    now: DateTime<Utc>,
) -> Result<MediaTrack, Error>
where
    S: ContentRepository + ?Sized,
{
    actor.require_admin()?;
    let language = upload.language.trim();
    if language.is_empty() || language.len() > 35 {
        return Err(Error::Validation("Invalid language".to_owned()));
    }
    if upload.data.is_empty() {
        return Err(Error::MissingFields(vec!["file"]));
    }
    if upload.data.len() > MAX_UPLOAD_BYTES {
        return Err(Error::Validation("File is too large".to_owned()));
    }
    let ext = check_file(upload.kind, &upload.file_name, &upload.content_type)?;
    let episode = store
        .content(episode_id)
        .await?
        .filter(|c| c.kind == ContentKind::Episode)
        .ok_or_else(|| Error::not_found(ContentKind::Episode))?;

    let id = Uuid::new_v4();
    let folder = match upload.kind {
        TrackKind::Audio => "audio",
        TrackKind::Subtitle => "subtitles",
    };
    let key = format!("episodes/{}/{folder}/{id}.{ext}", episode.id);
    let url = blobs.put(&key, &upload.content_type, upload.data).await?;
    let track = MediaTrack {
        id,
        episode_id: episode.id,
        kind: upload.kind,
        language: language.to_owned(),
        url: url.to_string(),
        created_at: now,
    };
    store.insert_track(&track).await?;
    info!(%key, "attached track");
    Ok(track)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::datasource::repository::NewContent;
    use crate::datasource::MemoryStore;
    use crate::models::Role;

    fn admin() -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        }
    }

    async fn episode(store: &MemoryStore) -> Uuid {
        let mut parent = None;
        for kind in [ContentKind::Series, ContentKind::Season, ContentKind::Episode] {
            let content = store
                .insert_content(&NewContent {
                    id: Uuid::new_v4(),
                    kind,
                    parent_id: parent,
                    category_id: None,
                    name: kind.label().into(),
                    description: String::new(),
                    media_url: String::new(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            parent = Some(content.id);
        }
        parent.unwrap()
    }

    fn subtitle(file_name: &str, content_type: &str) -> Upload {
        Upload {
            kind: TrackKind::Subtitle,
            language: "en".into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: Bytes::from_static(b"WEBVTT\n\n00:00.000 --> 00:01.000\nHello"),
        }
    }

    #[test]
    fn test_allow_list() {
        assert_eq!(
            check_file(TrackKind::Audio, "Theme.MP3", "audio/mpeg").unwrap(),
            "mp3"
        );
        assert!(check_file(TrackKind::Subtitle, "a.srt", "application/x-subrip").is_ok());
        assert!(check_file(TrackKind::Subtitle, "a.vtt", "text/vtt; charset=utf-8").is_ok());
        // audio mime with a subtitle extension
        assert!(check_file(TrackKind::Audio, "a.vtt", "audio/mpeg").is_err());
        assert!(check_file(TrackKind::Subtitle, "a.mp3", "text/vtt").is_err());
        assert!(check_file(TrackKind::Subtitle, "a.vtt", "audio/mpeg").is_err());
        assert!(check_file(TrackKind::Audio, ".mp3", "audio/mpeg").is_err());
        assert!(check_file(TrackKind::Audio, "noext", "audio/mpeg").is_err());
    }

    #[tokio::test]
    async fn test_attach_subtitle() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new(Url::parse("https://cdn.example.com/").unwrap());
        let episode_id = episode(&store).await;
        let track = attach_track(
            &store,
            &blobs,
            &admin(),
            episode_id,
            subtitle("episode.vtt", "text/vtt"),
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(track
            .url
            .starts_with(&format!("https://cdn.example.com/episodes/{episode_id}/subtitles/")));
        assert_eq!(store.tracks(episode_id).await.unwrap(), vec![track]);
    }

    #[tokio::test]
    async fn test_mismatched_upload_is_not_stored() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new(Url::parse("https://cdn.example.com/").unwrap());
        let episode_id = episode(&store).await;
        let err = attach_track(
            &store,
            &blobs,
            &admin(),
            episode_id,
            subtitle("episode.mp3", "text/vtt"),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.tracks(episode_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_to_unknown_episode() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new(Url::parse("https://cdn.example.com/").unwrap());
        let err = attach_track(
            &store,
            &blobs,
            &admin(),
            Uuid::new_v4(),
            subtitle("episode.vtt", "text/vtt"),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Episode not found");
    }
}
