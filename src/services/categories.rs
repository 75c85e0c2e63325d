use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::{CategoryRepository, StoreError};
use crate::errors::Error;
use crate::models::Category;
use crate::session::Session;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

const IN_USE: &str = "Category is in use by one or more series";

#[instrument(skip(store, input), fields(actor = %actor.user_id))]
pub async fn create<S>(
    store: &S,
    actor: &Session,
    input: CategoryInput,
    now: DateTime<Utc>,
) -> Result<Category, Error>
where
    S: CategoryRepository + ?Sized,
{
    actor.require_admin()?;
    input.validate()?;
    let category = Category {
        id: Uuid::new_v4(),
        name: input.name.trim().to_owned(),
        created_at: now,
    };
    match store.insert_category(&category).await {
        Ok(category) => Ok(category),
        Err(StoreError::Conflict) => Err(Error::Conflict("Category already exists".to_owned())),
        Err(err) => Err(err.into()),
    }
}

pub async fn list<S>(store: &S) -> Result<Vec<Category>, Error>
where
    S: CategoryRepository + ?Sized,
{
    Ok(store.categories().await?)
}

/// Refuses while any series still references the category.
#[instrument(skip(store), fields(actor = %actor.user_id))]
pub async fn delete<S>(store: &S, actor: &Session, id: Uuid) -> Result<(), Error>
where
    S: CategoryRepository + ?Sized,
{
    actor.require_admin()?;
    if store.category(id).await?.is_none() {
        return Err(Error::not_found("Category"));
    }
    if store.series_in_category(id).await? > 0 {
        return Err(Error::Conflict(IN_USE.to_owned()));
    }
    match store.delete_category(id).await {
        Ok(true) => {
            info!(%id, "deleted category");
            Ok(())
        }
        Ok(false) => Err(Error::not_found("Category")),
        // a series was assigned between the check and the delete
        Err(StoreError::Referenced) => Err(Error::Conflict(IN_USE.to_owned())),
        Err(err) => Err(err.into()),
    }
}
