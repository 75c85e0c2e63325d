use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::predicate::NotForContentType;
use tower_http::compression::{CompressionLayer, DefaultPredicate, Predicate};
use tower_http::decompression::DecompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::controllers::{
    auth, categories, content, media, playlists, subscription, watch_history,
};
use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

pub mod blob;
pub mod config;
pub mod controllers;
pub mod datasource;
pub mod errors;
pub mod jobs;
pub mod mailer;
pub mod models;
pub mod retry;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

// room for the multipart framing around the largest allowed file
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub fn router(app_state: AppState) -> Router {
    let compression_predicate = DefaultPredicate::new()
        .and(NotForContentType::const_new("application/octet-stream"));

    let upload = post(content::upload_track)
        .layer::<_, Infallible>(DefaultBodyLimit::disable())
        .layer::<_, Infallible>(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT));

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verification", post(auth::request_verification))
        .route("/auth/verify", post(auth::verify_email))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(auth::reset_password))
        .route("/auth/two-factor", put(auth::set_two_factor))
        .route("/auth/two-factor/confirm", post(auth::confirm_two_factor))
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/:id", delete(categories::delete))
        .route("/content/:kind", post(content::create))
        .route("/content/:kind/:id", get(content::get).delete(content::delete))
        .route("/content/:kind/:id/children", get(content::children))
        .route("/content/:kind/:id/media", put(content::link_media))
        .route("/content/:kind/:id/publish", post(content::publish))
        .route("/content/:kind/:id/unpublish", post(content::unpublish))
        .route("/episodes/:id/playback", get(content::playback))
        .route("/episodes/:id/tracks", upload)
        .route("/subscription", get(subscription::get))
        .route("/subscription/cancel", post(subscription::cancel))
        .route(
            "/watch-history",
            get(watch_history::list).post(watch_history::record),
        )
        .route("/playlists", get(playlists::list).post(playlists::create))
        .route("/playlists/:id", delete(playlists::delete))
        .route("/playlists/:id/content", post(playlists::add_series))
        .route(
            "/playlists/:id/content/:series_id",
            delete(playlists::remove_series),
        )
        .route("/media/:playback_id", get(media::info))
        .route("/media/:playback_id/text/:track_id", get(media::subtitle))
        .route("/bandwidth-test", get(media::bandwidth_test));

    Router::new()
        .route("/health", get(controllers::health))
        .nest("/api", api)
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new().compress_when(compression_predicate))
                .layer(DecompressionLayer::new()),
        )
}

pub async fn serve(app_state: AppState, addr: SocketAddr) -> Result<()> {
    let app = router(app_state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
