use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use vod_service::config::{AppConfig, DbConfig};
use vod_service::jobs::token_sweep;
use vod_service::state::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_config = DbConfig::from_env()?;
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let pool = state::create_db_pool(&db_config)?;
    sqlx::migrate!().run(&pool).await?;

    let addr = config.listen;
    let sweep_secs = config.token_sweep_secs;
    let app_state = AppState::new(config, pool)?;
    if sweep_secs > 0 {
        token_sweep::start(app_state.store.clone(), Duration::from_secs(sweep_secs));
    }

    vod_service::serve(app_state, addr).await
}
