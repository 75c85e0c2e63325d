use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use crate::blob::BlobError;
use crate::datasource::StoreError;
use crate::mailer::MailError;
use crate::services::content::PublishError;
use crate::services::tokens::TokenError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Unauthorized(String),
    #[error("Unauthorized")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Missing fields are required")]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Mux(#[from] mux::Error),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Self::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::MissingFields(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            Self::Token(TokenError::Store(_)) => internal(),
            Self::Token(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Mux(mux::Error::Status(code)) => upstream(*code, "Media provider request failed"),
            Self::Mux(mux::Error::NotAnAsset(_)) => (
                StatusCode::NOT_FOUND,
                "Playback id does not reference an asset".to_owned(),
            ),
            Self::Mux(_) => upstream(StatusCode::BAD_GATEWAY, "Media provider request failed"),
            Self::Mail(MailError::Status(code)) => upstream(*code, "Failed to send email"),
            Self::Mail(_) => upstream(StatusCode::BAD_GATEWAY, "Failed to send email"),
            Self::Blob(BlobError::Status(code)) => upstream(*code, "Failed to store upload"),
            Self::Blob(_) => upstream(StatusCode::BAD_GATEWAY, "Failed to store upload"),
            Self::Store(StoreError::Conflict) => {
                (StatusCode::CONFLICT, "Resource already exists".to_owned())
            }
            Self::Store(StoreError::Referenced) => (
                StatusCode::CONFLICT,
                "Resource is referenced by other records".to_owned(),
            ),
            Self::Store(StoreError::Database(_)) | Self::Internal(_) => internal(),
        }
    }
}

fn upstream(code: StatusCode, message: &str) -> (StatusCode, String) {
    let status = if code.is_client_error() || code.is_server_error() {
        code
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, message.to_owned())
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_owned(),
    )
}

impl From<PublishError> for Error {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Unauthorized => Self::Forbidden,
            PublishError::NotFound(kind) => Self::not_found(kind),
            PublishError::MissingFields(fields) => Self::MissingFields(fields),
            PublishError::Store(err) => Self::Store(err),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_keys().collect();
        fields.sort_unstable();
        Self::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        if status.is_server_error() {
            error!("request failed with {self:?}");
        } else {
            debug!("request rejected with {status}: {self}");
        }
        let body = Json(json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}

pub type InternalError = anyhow::Error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message() {
        let (status, message) = Error::MissingFields(vec!["description"]).status_and_message();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, "Missing fields are required");
    }

    #[test]
    fn test_provider_status_is_echoed() {
        let err = Error::Mux(mux::Error::Status(StatusCode::NOT_FOUND));
        assert_eq!(err.status_and_message().0, StatusCode::NOT_FOUND);
        let err = Error::Mux(mux::Error::Status(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.status_and_message().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = Error::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(
            err.status_and_message(),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned()
            )
        );
    }

    #[test]
    fn test_token_errors_are_client_errors() {
        let err = Error::Token(TokenError::Expired);
        assert_eq!(
            err.status_and_message(),
            (StatusCode::BAD_REQUEST, "Token has expired".to_owned())
        );
    }
}
