//! Error types for the ingestion and dashboard-read HTTP service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use telemetry_schema::ValidationError;
use tracing::{error, warn};

/// Errors surfaced by request handlers, mapped to HTTP status codes.
///
/// A malformed JSON body never reaches this type — axum's `Json`
/// extractor rejects it with a 400 before the handler runs.
///
/// - `400 Bad Request`: an invalid metric/snapshot
/// - `401 Unauthorized`: missing or incorrect `X-API-Key`
/// - `404 Not Found`: a referenced aggregator or device does not exist
/// - `500 Internal Server Error`: unexpected database or server failure
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Request body failed schema validation.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// `X-API-Key` header missing or not equal to the configured key.
    #[error("missing or invalid API key")]
    Unauthorized,

    /// A referenced aggregator does not exist.
    #[error("unknown aggregator: {aggregator_id}")]
    AggregatorNotFound { aggregator_id: String },

    /// A referenced device does not exist.
    #[error("unknown device: {device_id}")]
    DeviceNotFound { device_id: String },

    /// Database access failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else unexpected.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(ref e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Unauthorized => {
                warn!("rejected request with missing or invalid API key");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            Self::AggregatorNotFound { ref aggregator_id } => {
                warn!(aggregator_id, "unknown aggregator referenced");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::DeviceNotFound { ref device_id } => {
                warn!(device_id, "unknown device referenced");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::Database(ref e) => {
                error!(error = %e, "database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            Self::Internal { ref message } => {
                error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level startup errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("server failed: {message}")]
    ServerFailed { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("database pool failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("missing required configuration: {key}")]
    Missing { key: String },

    #[error("configuration parsing failed: {0}")]
    Parsing(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let response = IngestError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn aggregator_not_found_maps_to_404() {
        let response = IngestError::AggregatorNotFound {
            aggregator_id: "x".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let response = IngestError::Validation(ValidationError::Required { field: "name" })
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
