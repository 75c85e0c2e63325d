use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::controllers::{created, data, ApiResult, Created};
use crate::errors::Error;
use crate::models::Category;
use crate::services::categories::{self, CategoryInput};
use crate::session::Session;
use crate::state::SharedStore;

pub async fn list(State(store): State<SharedStore>) -> ApiResult<Vec<Category>> {
    Ok(data(categories::list(&*store).await?))
}

pub async fn create(
    session: Session,
    State(store): State<SharedStore>,
    Json(input): Json<CategoryInput>,
) -> Created<Category> {
    let category = categories::create(&*store, &session, input, Utc::now()).await?;
    Ok(created(category))
}

pub async fn delete(
    session: Session,
    Path(id): Path<Uuid>,
    State(store): State<SharedStore>,
) -> Result<StatusCode, Error> {
    categories::delete(&*store, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
