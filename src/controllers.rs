use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::errors::Error;

pub mod auth;
pub mod categories;
pub mod content;
pub mod media;
pub mod playlists;
pub mod subscription;
pub mod watch_history;

/// Success envelope, every JSON response carries its payload under `data`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub type ApiResult<T> = Result<Json<Data<T>>, Error>;
pub type Created<T> = Result<(StatusCode, Json<Data<T>>), Error>;

pub fn data<T>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

pub fn created<T>(data: T) -> (StatusCode, Json<Data<T>>) {
    (StatusCode::CREATED, Json(Data { data }))
}

pub fn message(message: &'static str) -> Json<Data<Message>> {
    data(Message { message })
}

pub async fn health() -> Json<Data<Message>> {
    message("ok")
}
