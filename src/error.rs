//! Request-level errors and their HTTP mapping.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Signup collisions and occupied roll-number targets.
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    Unauthorized,

    /// The stored sheets do not have the shape the operation needs.
    #[error("{0}")]
    Internal(String),

    /// Store failures surface their message verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "web")]
mod web {
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use serde_json::json;

    use super::AppError;

    impl AppError {
        pub const fn status_code(&self) -> StatusCode {
            match self {
                Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
                Self::NotFound(_) => StatusCode::NOT_FOUND,
                Self::Unauthorized => StatusCode::UNAUTHORIZED,
                Self::Internal(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            if self.status_code().is_server_error() {
                log::error!("{self}");
            }
            (self.status_code(), self.to_string()).into_response()
        }
    }

    /// The `/user` routes answer errors as `{"success": false, "message": ...}`.
    #[derive(Debug)]
    pub struct JsonError(pub AppError);

    impl From<AppError> for JsonError {
        fn from(err: AppError) -> Self {
            JsonError(err)
        }
    }

    impl IntoResponse for JsonError {
        fn into_response(self) -> Response {
            let status = self.0.status_code();
            if status.is_server_error() {
                log::error!("{}", self.0);
            }
            let body = json!({ "success": false, "message": self.0.to_string() });
            (status, Json(body)).into_response()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::store::StoreError;

        #[test]
        fn status_codes_follow_error_kind() {
            assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
            assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                AppError::Store(StoreError::MissingSheet("Members".into())).status_code(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }

        #[test]
        fn store_messages_pass_through() {
            let err = AppError::from(StoreError::MissingSheet("Members".into()));
            assert_eq!(err.to_string(), "Unable to parse range: Members");
        }
    }
}

#[cfg(feature = "web")]
pub use web::JsonError;
