use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid content type")]
    InvalidContentType,

    #[error("Invalid body, {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid JSON: {0}")]
    MalformedJson(String),

    #[error("Invalid \"files\": {0}")]
    InvalidFiles(#[from] runbox_types::TypeError),

    #[error("No \"files\" found in URL parameters")]
    MissingFilesParam,

    #[error("Invalid \"files\", {size} bytes exceeds the {max} byte limit")]
    ImportTooLarge { size: usize, max: usize },

    #[error("Sandbox not found")]
    NotFound,

    #[error("Unauthorized - no writeKey")]
    MissingWriteKey,

    #[error("Unauthorized - wrong writeKey (none found)")]
    NoWriteKey,

    #[error("Unauthorized - wrong writeKey")]
    WrongWriteKey,

    #[error("storage inconsistency: {read_key} stored without a write key: {source}")]
    StorageInconsistency {
        read_key: String,
        source: runbox_store::StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] runbox_store::StoreError),

    #[error("key generation failed: {0}")]
    Key(#[from] runbox_crypto::KeyError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidContentType
            | Self::MalformedJson(_)
            | Self::InvalidFiles(_)
            | Self::MissingFilesParam
            | Self::ImportTooLarge { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MissingWriteKey => StatusCode::UNAUTHORIZED,
            Self::NoWriteKey | Self::WrongWriteKey => StatusCode::FORBIDDEN,
            Self::StorageInconsistency { .. }
            | Self::Store(_)
            | Self::Key(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            (status, "Internal server error").into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_http_statuses() {
        assert_eq!(ServerError::InvalidContentType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::PayloadTooLarge { size: 20_000, max: 10_240 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServerError::ImportTooLarge { size: 20_000, max: 10_240 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServerError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::MissingWriteKey.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServerError::NoWriteKey.status(), StatusCode::FORBIDDEN);
        assert_eq!(ServerError::WrongWriteKey.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ServerError::Internal("secret path /var/lib".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
