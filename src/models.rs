use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Series,
    Season,
    Episode,
    Trailer,
    Banner,
}

impl ContentKind {
    /// The kind a parent must have, `None` for top level entities.
    pub fn parent_kind(self) -> Option<ContentKind> {
        match self {
            Self::Series => None,
            Self::Season | Self::Trailer | Self::Banner => Some(Self::Series),
            Self::Episode => Some(Self::Season),
        }
    }

    /// Video kinds need a linked transcoded asset before they can be published.
    pub fn is_video(self) -> bool {
        matches!(self, Self::Episode | Self::Trailer)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Series => "Series",
            Self::Season => "Season",
            Self::Episode => "Episode",
            Self::Trailer => "Trailer",
            Self::Banner => "Banner",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaAsset {
    pub asset_id: String,
    pub playback_id: String,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub id: Uuid,
    pub kind: ContentKind,
    pub parent_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub media_url: String,
    pub media_asset: Option<MediaAsset>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "track_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MediaTrack {
    pub id: Uuid,
    pub episode_id: Uuid,
    pub kind: TrackKind,
    pub language: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: SubscriptionStatus,
    pub tier: String,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PlaylistItem {
    pub playlist_id: Uuid,
    pub series_id: Uuid,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistWithItems {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WatchHistoryRecord {
    pub user_id: Uuid,
    pub series_id: Uuid,
    pub episode_id: Uuid,
    pub position_seconds: f64,
    pub last_watched_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Verification,
    PasswordReset,
    TwoFactor,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OneTimeToken {
    pub id: Uuid,
    pub purpose: TokenPurpose,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Clone, Debug)]
pub struct MediaInfoTrack {
    pub id: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<mux::models::Track> for MediaInfoTrack {
    fn from(track: mux::models::Track) -> Self {
        let kind = match track.kind {
            mux::models::TrackKind::Video => "video",
            mux::models::TrackKind::Audio => "audio",
            mux::models::TrackKind::Text => "text",
            mux::models::TrackKind::Other => "other",
        };
        Self {
            id: track.id,
            kind,
            language: track.language_code,
            name: track.name,
        }
    }
}

/// Provider asset metadata as exposed by the media endpoints.
#[derive(Serialize, Clone, Debug)]
pub struct MediaInfo {
    pub asset_id: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub tracks: Vec<MediaInfoTrack>,
}

impl From<mux::models::Asset> for MediaInfo {
    fn from(asset: mux::models::Asset) -> Self {
        Self {
            asset_id: asset.id,
            ready: asset.status == mux::models::AssetStatus::Ready,
            duration_seconds: asset.duration,
            aspect_ratio: asset.aspect_ratio,
            tracks: asset.tracks.into_iter().map(Into::into).collect(),
        }
    }
}
