//! HTTP mapping of [`Error`].
//!
//! Every failure is answered with `{"error": "<message>"}` and a status that
//! depends on the error kind.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

impl Error {
    /// Status code sent to the client for this error
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidTransition { .. }
            | Self::PaymentFinalized => StatusCode::BAD_REQUEST,

            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,

            Self::Forbidden => StatusCode::FORBIDDEN,

            Self::NotFound { .. } | Self::NoAvailableItems => StatusCode::NOT_FOUND,

            Self::Conflict { .. } => StatusCode::CONFLICT,

            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,

            Self::Config { .. }
            | Self::Database(_)
            | Self::MissingApiKeys { .. }
            | Self::PasswordHash(_)
            | Self::Io(_)
            | Self::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            warn!("Request rejected ({status}): {self}");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Handler result carrying a JSON body
pub type ApiResult<T> = Result<Json<T>, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            Error::validation("rating", "out of range").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::PaymentFinalized.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::not_found("item", 3).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::conflict("dup").http_status(), StatusCode::CONFLICT);
        assert_eq!(Error::Forbidden.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::MissingApiKeys {
                keys: vec!["OPENAI_API_KEY"]
            }
            .http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::PaymentFinalized.to_string(),
            "Payment state can no longer be modified"
        );
        let missing = Error::MissingApiKeys {
            keys: vec!["EDAMAM_APP_ID", "EDAMAM_APP_KEY"],
        };
        assert_eq!(missing.to_string(), "Missing API keys: EDAMAM_APP_ID, EDAMAM_APP_KEY");
    }
}
