use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::FromRef;
use chrono::TimeDelta;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use url::Url;

use crate::blob::{BlobStore, HttpBlobStore, MemoryBlobStore};
use crate::config::{AppConfig, DbConfig};
use crate::datasource::{PgStore, Store};
use crate::mailer::{HttpMailer, LogMailer, Mailer};
use crate::session::SessionKeys;

pub type ReqwestClient = reqwest::Client;
pub type DBPool = Pool<Postgres>;
pub type SharedStore = Arc<dyn Store>;
pub type SharedMailer = Arc<dyn Mailer>;
pub type SharedBlobStore = Arc<dyn BlobStore>;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub mailer: SharedMailer,
    pub blobs: SharedBlobStore,
    pub media: mux::Client,
    pub sessions: SessionKeys,
}

impl AppState {
    /// Wires the Postgres store and the configured providers.
    pub fn new(config: AppConfig, pool: DBPool) -> Result<Self> {
        let client = create_reqwest_client(&config)?;
        let store: SharedStore = Arc::new(PgStore::new(pool));
        Self::with_store(config, client, store)
    }

    pub fn with_store(config: AppConfig, client: ReqwestClient, store: SharedStore) -> Result<Self> {
        let mailer: SharedMailer = match (&config.mail_endpoint, &config.mail_api_key) {
            (Some(endpoint), Some(api_key)) => Arc::new(HttpMailer::new(
                client.clone(),
                endpoint.clone(),
                api_key.clone(),
                config.mail_from.clone(),
            )),
            _ => Arc::new(LogMailer),
        };
        let blobs: SharedBlobStore = match (&config.blob_endpoint, &config.blob_public_base) {
            (Some(endpoint), Some(public_base)) => Arc::new(HttpBlobStore::new(
                client.clone(),
                endpoint.clone(),
                public_base.clone(),
                config.blob_api_key.clone(),
            )),
            _ => Arc::new(MemoryBlobStore::new(Url::parse("memory://uploads/")?)),
        };
        let media = mux::Client::new(
            client,
            config.mux_api_base.clone(),
            config.mux_stream_base.clone(),
            config.mux_credentials(),
        );
        let sessions = SessionKeys::new(&config.jwt_secret, TimeDelta::hours(config.session_hours));
        Ok(Self {
            store,
            mailer,
            blobs,
            media,
            sessions,
        })
    }
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(input: &AppState) -> Self {
        input.store.clone()
    }
}

impl FromRef<AppState> for SharedMailer {
    fn from_ref(input: &AppState) -> Self {
        input.mailer.clone()
    }
}

impl FromRef<AppState> for SharedBlobStore {
    fn from_ref(input: &AppState) -> Self {
        input.blobs.clone()
    }
}

impl FromRef<AppState> for mux::Client {
    fn from_ref(input: &AppState) -> Self {
        input.media.clone()
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(input: &AppState) -> Self {
        input.sessions.clone()
    }
}

pub fn create_reqwest_client(config: &AppConfig) -> Result<ReqwestClient> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?)
}

pub fn create_db_pool(config: &DbConfig) -> Result<DBPool> {
    let mut url = Url::parse("postgres://")?;
    url.set_host(Some(&config.host))?;
    url.set_password(Some(&config.pass))
        .map_err(|()| anyhow::anyhow!("password should be accepted"))?;
    url.set_username(&config.user)
        .map_err(|()| anyhow::anyhow!("username should be accepted"))?;
    url.set_port(Some(config.port))
        .map_err(|()| anyhow::anyhow!("port should be accepted"))?;
    url.set_path(&config.database);

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_lazy(url.as_ref())?)
}
