use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::repository::SubscriptionRepository;
use crate::datasource::{PgStore, Result};
use crate::models::Subscription;

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        let record = sqlx::query_as::<_, Subscription>(include_str!(
            "../../../queries/query_subscription_by_user.sql"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }

    async fn mark_cancel_at_period_end(
        &self,
        user_id: Uuid,
        canceled_at: DateTime<Utc>,
    ) -> Result<Option<Subscription>> {
        let record = sqlx::query_as::<_, Subscription>(include_str!(
            "../../../queries/update_subscription_cancel.sql"
        ))
        .bind(user_id)
        .bind(canceled_at)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(include_str!("../../../queries/upsert_subscription.sql"))
            .bind(subscription.id)
            .bind(subscription.user_id)
            .bind(subscription.status)
            .bind(&subscription.tier)
            .bind(subscription.current_period_end)
            .bind(subscription.cancel_at_period_end)
            .bind(subscription.canceled_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
