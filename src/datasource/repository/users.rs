use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::repository::UserRepository;
use crate::datasource::{PgStore, Result};
use crate::models::User;

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &User) -> Result<User> {
        let record = sqlx::query_as::<_, User>(include_str!("../../../queries/insert_user.sql"))
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.email_verified_at)
            .bind(user.two_factor_enabled)
            .bind(user.created_at)
            .fetch_one(self.pool())
            .await?;
        Ok(record)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let record =
            sqlx::query_as::<_, User>(include_str!("../../../queries/query_user_by_email.sql"))
                .bind(email)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, User>(include_str!("../../../queries/query_user_by_id.sql"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(record)
    }

    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/update_user_email_verified.sql"))
            .bind(email)
            .bind(at)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password_hash(&self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/update_user_password_hash.sql"))
            .bind(email)
            .bind(password_hash)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_two_factor(&self, user_id: Uuid, enabled: bool) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/update_user_two_factor.sql"))
            .bind(user_id)
            .bind(enabled)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_two_factor_confirmation(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(include_str!("../../../queries/upsert_two_factor_confirmation.sql"))
            .bind(user_id)
            .bind(at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn take_two_factor_confirmation(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_two_factor_confirmation.sql"))
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
