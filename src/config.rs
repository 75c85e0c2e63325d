use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use anyhow::Result;
use serde::Deserialize;
use url::Url;

/// Postgres connection settings, read from `PG_*` variables.
#[derive(Debug, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("PG_").from_env()?)
    }
}

/// Service settings, read from `APP_*` variables.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    pub jwt_secret: String,
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
    /// Seconds between expired token sweeps, 0 disables the job.
    #[serde(default = "default_token_sweep_secs")]
    pub token_sweep_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    pub mux_token_id: Option<String>,
    pub mux_token_secret: Option<String>,
    #[serde(default = "default_mux_api_base")]
    pub mux_api_base: Url,
    #[serde(default = "default_mux_stream_base")]
    pub mux_stream_base: Url,

    pub mail_endpoint: Option<Url>,
    pub mail_api_key: Option<String>,
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    pub blob_endpoint: Option<Url>,
    pub blob_api_key: Option<String>,
    pub blob_public_base: Option<Url>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("APP_").from_env()?)
    }

    /// Settings for running without any external provider configured.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            listen: default_listen(),
            jwt_secret: jwt_secret.into(),
            session_hours: default_session_hours(),
            token_sweep_secs: default_token_sweep_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            mux_token_id: None,
            mux_token_secret: None,
            mux_api_base: default_mux_api_base(),
            mux_stream_base: default_mux_stream_base(),
            mail_endpoint: None,
            mail_api_key: None,
            mail_from: default_mail_from(),
            blob_endpoint: None,
            blob_api_key: None,
            blob_public_base: None,
        }
    }

    pub fn mux_credentials(&self) -> Option<mux::Credentials> {
        self.mux_token_id
            .clone()
            .zip(self.mux_token_secret.clone())
            .map(|(token_id, token_secret)| mux::Credentials {
                token_id,
                token_secret,
            })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("listen", &self.listen)
            .field("session_hours", &self.session_hours)
            .field("token_sweep_secs", &self.token_sweep_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("mux_api_base", &self.mux_api_base.as_str())
            .field("mux_stream_base", &self.mux_stream_base.as_str())
            .field("mail_endpoint", &self.mail_endpoint.as_ref().map(Url::as_str))
            .field("mail_from", &self.mail_from)
            .field("blob_endpoint", &self.blob_endpoint.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 8000)
}

fn default_session_hours() -> i64 {
    24 * 7
}

fn default_token_sweep_secs() -> u64 {
    60 * 60
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_mux_api_base() -> Url {
    Url::parse(mux::DEFAULT_API_BASE).expect("static url is valid")
}

fn default_mux_stream_base() -> Url {
    Url::parse(mux::DEFAULT_STREAM_BASE).expect("static url is valid")
}

fn default_mail_from() -> String {
    "no-reply@localhost".to_owned()
}
