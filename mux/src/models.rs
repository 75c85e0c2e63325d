use serde::Deserialize;

#[derive(Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPolicy {
    Public,
    Signed,
    Drm,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PlaybackObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl PlaybackObject {
    pub fn is_asset(&self) -> bool {
        self.kind == "asset"
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PlaybackId {
    pub id: String,
    pub policy: PlaybackPolicy,
    pub object: PlaybackObject,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AssetPlaybackId {
    pub id: String,
    pub policy: PlaybackPolicy,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Preparing,
    Ready,
    Errored,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Track {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub text_type: Option<String>,
    pub language_code: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub duration: Option<f64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Asset {
    pub id: String,
    pub status: AssetStatus,
    pub duration: Option<f64>,
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub playback_ids: Vec<AssetPlaybackId>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}
