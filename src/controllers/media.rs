use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use rand::RngCore;
use serde::Deserialize;

use crate::controllers::{data, ApiResult};
use crate::errors::Error;
use crate::models::MediaInfo;

pub const DEFAULT_BANDWIDTH_BYTES: usize = 1024 * 1024;
pub const MAX_BANDWIDTH_BYTES: usize = 10 * 1024 * 1024;

pub async fn info(
    Path(playback_id): Path<String>,
    State(media): State<mux::Client>,
) -> ApiResult<MediaInfo> {
    let asset = media.asset_by_playback_id(&playback_id).await?;
    Ok(data(asset.into()))
}

pub async fn subtitle(
    Path((playback_id, track_id)): Path<(String, String)>,
    State(media): State<mux::Client>,
) -> Result<impl IntoResponse, Error> {
    let track_id = track_id.strip_suffix(".vtt").unwrap_or(&track_id);
    let body = media.subtitle_vtt(&playback_id, track_id).await?;
    Ok(([(CONTENT_TYPE, "text/vtt; charset=utf-8")], body))
}

#[derive(Debug, Deserialize)]
pub struct BandwidthQuery {
    bytes: Option<usize>,
}

/// Random payload for client side throughput measurement.
pub async fn bandwidth_test(Query(query): Query<BandwidthQuery>) -> impl IntoResponse {
    let size = query
        .bytes
        .unwrap_or(DEFAULT_BANDWIDTH_BYTES)
        .min(MAX_BANDWIDTH_BYTES);
    let mut payload = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut payload);
    (
        [
            (CONTENT_TYPE, "application/octet-stream"),
            (CACHE_CONTROL, "no-store"),
        ],
        payload,
    )
}
