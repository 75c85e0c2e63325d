use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use vod_service::config::AppConfig;
use vod_service::datasource::{MemoryStore, SubscriptionRepository, UserRepository};
use vod_service::models::{Role, Subscription, SubscriptionStatus, User};
use vod_service::services::accounts::hash_password;
use vod_service::state::{self, AppState, SharedStore};

const ADMIN_EMAIL: &str = "admin@localhost";
const ADMIN_PASSWORD: &str = "development";

/// Runs the api against an in-memory store with a seeded admin account.
#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|_| AppConfig::local("development"));
    let client = state::create_reqwest_client(&config)?;

    let memory = MemoryStore::new();
    let now = Utc::now();
    let admin = memory
        .insert_user(&User {
            id: Uuid::new_v4(),
            email: ADMIN_EMAIL.to_owned(),
            name: "Admin".to_owned(),
            password_hash: hash_password(ADMIN_PASSWORD)?,
            role: Role::Admin,
            email_verified_at: Some(now),
            two_factor_enabled: false,
            created_at: now,
        })
        .await?;
    memory
        .upsert_subscription(&Subscription {
            id: Uuid::new_v4(),
            user_id: admin.id,
            status: SubscriptionStatus::Active,
            tier: "premium".to_owned(),
            current_period_end: now + Duration::days(365),
            cancel_at_period_end: false,
            canceled_at: None,
        })
        .await?;
    info!("seeded {ADMIN_EMAIL} with password {ADMIN_PASSWORD}");

    let store: SharedStore = Arc::new(memory);
    let addr = config.listen;
    let app_state = AppState::with_store(config, client, store)?;
    vod_service::serve(app_state, addr).await
}
