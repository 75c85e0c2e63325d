pub mod models;

use std::fmt;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{instrument, trace};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.mux.com";
pub const DEFAULT_STREAM_BASE: &str = "https://stream.mux.com";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    ParseUrl(#[from] url::ParseError),
    #[error("request failed with status code: {0}")]
    Status(StatusCode),
    #[error("playback id {0} does not reference an asset")]
    NotAnAsset(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Deserialize)]
pub struct Single<T> {
    pub data: T,
}

#[derive(Clone)]
pub struct Credentials {
    pub token_id: String,
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token_id", &self.token_id)
            .finish_non_exhaustive()
    }
}

/// Client for the video hosting API.
///
/// Metadata lookups go to the api base and are authenticated with the
/// access token pair, subtitle text is fetched from the public stream base.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_base: Url,
    stream_base: Url,
    credentials: Option<Credentials>,
}

impl Client {
    pub fn new(
        http: reqwest::Client,
        api_base: Url,
        stream_base: Url,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            api_base,
            stream_base,
            credentials,
        }
    }

    pub fn with_defaults(http: reqwest::Client, credentials: Option<Credentials>) -> Result<Self> {
        Ok(Self::new(
            http,
            Url::parse(DEFAULT_API_BASE)?,
            Url::parse(DEFAULT_STREAM_BASE)?,
            credentials,
        ))
    }

    #[instrument(skip(self))]
    pub async fn playback_id(&self, playback_id: &str) -> Result<models::PlaybackId> {
        let url = join(&self.api_base, &["video", "v1", "playback-ids", playback_id])?;
        let document = self.get_document::<Single<models::PlaybackId>>(url).await?;
        Ok(document.data)
    }

    #[instrument(skip(self))]
    pub async fn asset(&self, asset_id: &str) -> Result<models::Asset> {
        let url = join(&self.api_base, &["video", "v1", "assets", asset_id])?;
        let document = self.get_document::<Single<models::Asset>>(url).await?;
        Ok(document.data)
    }

    /// Resolves a playback id to the asset it plays.
    pub async fn asset_by_playback_id(&self, playback_id: &str) -> Result<models::Asset> {
        let playback = self.playback_id(playback_id).await?;
        if !playback.object.is_asset() {
            return Err(Error::NotAnAsset(playback_id.to_owned()));
        }
        self.asset(&playback.object.id).await
    }

    /// HLS manifest url for a playback id.
    pub fn stream_url(&self, playback_id: &str) -> Result<Url> {
        join(&self.stream_base, &[&format!("{playback_id}.m3u8")])
    }

    #[instrument(skip(self))]
    pub async fn subtitle_vtt(&self, playback_id: &str, track_id: &str) -> Result<String> {
        let file = format!("{track_id}.vtt");
        let url = join(&self.stream_base, &[playback_id, "text", &file])?;
        trace!(%url, "fetching subtitle track");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(response.text().await?)
    }

    async fn get_document<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        trace!(%url, "requesting document");
        let mut request = self.http.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.token_id, Some(&credentials.token_secret));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(response.json::<T>().await?)
    }
}

fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
