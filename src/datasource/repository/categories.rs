use async_trait::async_trait;
use uuid::Uuid;

use crate::datasource::repository::CategoryRepository;
use crate::datasource::{PgStore, Result};
use crate::models::Category;

#[async_trait]
impl CategoryRepository for PgStore {
    async fn insert_category(&self, category: &Category) -> Result<Category> {
        let record =
            sqlx::query_as::<_, Category>(include_str!("../../../queries/insert_category.sql"))
                .bind(category.id)
                .bind(&category.name)
                .bind(category.created_at)
                .fetch_one(self.pool())
                .await?;
        Ok(record)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let records =
            sqlx::query_as::<_, Category>(include_str!("../../../queries/query_categories.sql"))
                .fetch_all(self.pool())
                .await?;
        Ok(records)
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>> {
        let record =
            sqlx::query_as::<_, Category>(include_str!("../../../queries/query_category_by_id.sql"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    async fn series_in_category(&self, id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(include_str!("../../../queries/query_category_usage.sql"))
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../../../queries/delete_category.sql"))
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
