use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::datasource::{StoreError, SubscriptionRepository};
use crate::errors::Error;
use crate::models::Subscription;

/// Access lasts while the status is active or trialing and the paid period has not ended.
pub fn grants_access(subscription: &Subscription, now: DateTime<Utc>) -> bool {
    subscription.status.grants_access() && subscription.current_period_end > now
}

pub async fn has_active_access<S>(
    store: &S,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, StoreError>
where
    S: SubscriptionRepository + ?Sized,
{
    Ok(store
        .subscription_for_user(user_id)
        .await?
        .is_some_and(|subscription| grants_access(&subscription, now)))
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessSummary {
    pub has_access: bool,
    pub subscription: Option<Subscription>,
}

pub async fn summary<S>(store: &S, user_id: Uuid, now: DateTime<Utc>) -> Result<AccessSummary, Error>
where
    S: SubscriptionRepository + ?Sized,
{
    let subscription = store.subscription_for_user(user_id).await?;
    Ok(AccessSummary {
        has_access: subscription
            .as_ref()
            .is_some_and(|subscription| grants_access(subscription, now)),
        subscription,
    })
}

/// Stops renewal, access continues until the current period ends.
#[instrument(skip(store))]
pub async fn cancel<S>(store: &S, user_id: Uuid, now: DateTime<Utc>) -> Result<Subscription, Error>
where
    S: SubscriptionRepository + ?Sized,
{
    let subscription = store
        .mark_cancel_at_period_end(user_id, now)
        .await?
        .ok_or_else(|| Error::NotFound("No subscription found".to_owned()))?;
    info!("subscription set to cancel at {}", subscription.current_period_end);
    Ok(subscription)
}
