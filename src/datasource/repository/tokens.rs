use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::repository::TokenRepository;
use crate::datasource::{PgStore, Result};
use crate::models::{OneTimeToken, TokenPurpose};

#[async_trait]
impl TokenRepository for PgStore {
    async fn replace_token(&self, token: &OneTimeToken) -> Result<()> {
        let mut transaction = self.pool().begin().await?;
        sqlx::query(include_str!("../../../queries/delete_token_by_purpose_email.sql"))
            .bind(token.purpose)
            .bind(&token.email)
            .execute(&mut *transaction)
            .await?;
        sqlx::query(include_str!("../../../queries/insert_token.sql"))
            .bind(token.id)
            .bind(token.purpose)
            .bind(&token.email)
            .bind(&token.code)
            .bind(token.expires_at)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn token_by_code(
        &self,
        purpose: TokenPurpose,
        code: &str,
    ) -> Result<Option<OneTimeToken>> {
        let record =
            sqlx::query_as::<_, OneTimeToken>(include_str!("../../../queries/query_token_by_code.sql"))
                .bind(purpose)
                .bind(code)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    async fn delete_token(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_token.sql"))
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(include_str!("../../../queries/delete_expired_tokens.sql"))
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
