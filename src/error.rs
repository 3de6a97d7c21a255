//! Structured error handling for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

use crate::response::ApiResponse;
use crate::staking::StakingError;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    // Client errors (4xx)
    NotFound(String),
    Conflict(String),
    ValidationError { field: String, message: String },

    // Ledger rejections with structured context
    InsufficientStake { pool: String, required: f64, provided: f64 },
    InvalidLockPeriod { pool: String, requested: u32, allowed: Vec<u32> },
    LockPeriodActive { position_id: String, remaining_days: i64, unlock_time: String },

    // Server errors (5xx)
    Internal(String),
    StorageError(String),
}

impl AppError {
    /// Get HTTP status code for error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,

            AppError::InsufficientStake { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidLockPeriod { .. } => StatusCode::BAD_REQUEST,
            AppError::LockPeriodActive { .. } => StatusCode::CONFLICT,

            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",

            AppError::InsufficientStake { .. } => "INSUFFICIENT_STAKE",
            AppError::InvalidLockPeriod { .. } => "INVALID_LOCK_PERIOD",
            AppError::LockPeriodActive { .. } => "LOCK_PERIOD_ACTIVE",

            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::ValidationError { field, message } => {
                format!("Validation error on field '{}': {}", field, message)
            }

            AppError::InsufficientStake { pool, required, provided } => {
                format!(
                    "Stake value {:.2} is below the {} minimum of {:.2}",
                    provided, pool, required
                )
            }
            AppError::InvalidLockPeriod { pool, requested, .. } => {
                format!("Lock period of {} days is not offered by {}", requested, pool)
            }
            AppError::LockPeriodActive { position_id, remaining_days, .. } => {
                format!("Position {} is locked for {} more days", position_id, remaining_days)
            }

            AppError::Internal(_) => "Internal server error occurred".to_string(),
            AppError::StorageError(_) => "Storage operation failed".to_string(),
        }
    }

    /// Get error details as JSON
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::ValidationError { field, .. } => Some(json!({ "field": field })),
            AppError::InsufficientStake { pool, required, provided } => Some(json!({
                "pool": pool,
                "required": required,
                "provided": provided
            })),
            AppError::InvalidLockPeriod { pool, requested, allowed } => Some(json!({
                "pool": pool,
                "requested": requested,
                "allowed": allowed
            })),
            AppError::LockPeriodActive { position_id, remaining_days, unlock_time } => Some(json!({
                "position_id": position_id,
                "remaining_days": remaining_days,
                "unlock_time": unlock_time
            })),
            _ => None,
        }
    }

    /// Get help text for error
    pub fn help(&self) -> Option<String> {
        match self {
            AppError::ValidationError { .. } => {
                Some("Check the field requirements and try again".to_string())
            }
            AppError::InsufficientStake { .. } => {
                Some("Add more or higher-valued assets, or pick a pool with a lower minimum".to_string())
            }
            AppError::InvalidLockPeriod { .. } => {
                Some("Choose one of the lock periods listed in details.allowed".to_string())
            }
            AppError::LockPeriodActive { .. } => {
                Some("Wait until unlock_time or use emergency-close and forfeit part of the rewards".to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            // internal causes are logged, never returned
            let cause = match &self {
                AppError::Internal(cause) | AppError::StorageError(cause) => cause.as_str(),
                _ => "",
            };
            tracing::error!(
                request_id = %request_id,
                error_code = self.error_code(),
                status = %status,
                cause,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = self.error_code(),
                status = %status,
                "Request rejected"
            );
        }

        let body = ApiResponse::error(self.error_code(), self.message())
            .with_details(self.details())
            .with_meta(json!({
                "request_id": request_id,
                "timestamp": chrono::Utc::now().timestamp(),
                "help": self.help(),
            }));

        (status, Json(body)).into_response()
    }
}

// Convenient type alias
pub type Result<T> = std::result::Result<T, AppError>;

impl From<StakingError> for AppError {
    fn from(err: StakingError) -> Self {
        match err {
            StakingError::Validation(message) => AppError::ValidationError {
                field: "request".to_string(),
                message,
            },
            StakingError::InsufficientStake { pool, required, provided } => AppError::InsufficientStake {
                pool: pool.to_string(),
                required,
                provided,
            },
            StakingError::InvalidLockPeriod { pool, requested, allowed } => AppError::InvalidLockPeriod {
                pool: pool.to_string(),
                requested,
                allowed,
            },
            err @ StakingError::PositionNotFound(_) => AppError::NotFound(err.to_string()),
            err @ StakingError::AssetNotFound { .. } => AppError::NotFound(err.to_string()),
            StakingError::LockPeriodActive { position_id, remaining_days, unlock_time } => {
                AppError::LockPeriodActive {
                    position_id,
                    remaining_days,
                    unlock_time: unlock_time.to_rfc3339(),
                }
            }
            err @ StakingError::PositionClosed(_) => AppError::Conflict(err.to_string()),
            StakingError::Storage(cause) => AppError::StorageError(cause),
            err @ StakingError::Metrics(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::PoolType;
    use chrono::Utc;

    #[test]
    fn test_error_response() {
        let error = AppError::ValidationError {
            field: "lock_days".to_string(),
            message: "Must be positive".to_string(),
        };

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert!(error.details().is_some());
        assert!(error.help().is_some());
    }

    #[test]
    fn test_staking_error_mapping() {
        let cases: Vec<(StakingError, StatusCode, &str)> = vec![
            (StakingError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                StakingError::InsufficientStake {
                    pool: PoolType::CrossDimension,
                    required: 5000.0,
                    provided: 10.0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_STAKE",
            ),
            (
                StakingError::InvalidLockPeriod {
                    pool: PoolType::SingleDimension,
                    requested: 31,
                    allowed: vec![30, 90],
                },
                StatusCode::BAD_REQUEST,
                "INVALID_LOCK_PERIOD",
            ),
            (StakingError::PositionNotFound("p".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                StakingError::AssetNotFound {
                    position_id: "p".into(),
                    asset_id: "a".into(),
                },
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                StakingError::LockPeriodActive {
                    position_id: "p".into(),
                    remaining_days: 3,
                    unlock_time: Utc::now(),
                },
                StatusCode::CONFLICT,
                "LOCK_PERIOD_ACTIVE",
            ),
            (StakingError::PositionClosed("p".into()), StatusCode::CONFLICT, "CONFLICT"),
            (StakingError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status_code(), status);
            assert_eq!(app.error_code(), code);
        }
    }

    #[test]
    fn test_internal_cause_is_hidden() {
        let error: AppError = StakingError::Storage("connection reset by peer".into()).into();
        assert!(!error.to_string().contains("connection reset"));
    }

    #[test]
    fn test_insufficient_stake_display() {
        let error = AppError::InsufficientStake {
            pool: "CROSS_DIMENSION".to_string(),
            required: 5000.0,
            provided: 1100.0,
        };

        let message = error.to_string();
        assert!(message.contains("5000.00"));
        assert!(message.contains("1100.00"));
        assert_eq!(error.details().unwrap()["required"], 5000.0);
    }
}
