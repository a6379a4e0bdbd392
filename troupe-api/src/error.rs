use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use troupe_catalog::CatalogError;
use troupe_core::repository::StoreError;
use troupe_core::CoreError;
use troupe_group::workflow::WorkflowError;
use troupe_match::ClusterError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    Internal(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Gone(msg) => (StatusCode::GONE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::BadRequest(msg),
            CoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let msg = err.to_string();
        match err {
            WorkflowError::GroupNotFound(_)
            | WorkflowError::ConfirmationNotFound(_)
            | WorkflowError::TokenInvalid => AppError::NotFound(msg),
            WorkflowError::TokenExpired => AppError::Gone(msg),
            WorkflowError::AlreadyResponded
            | WorkflowError::CapacityExceeded
            | WorkflowError::GroupClosed
            | WorkflowError::PaymentNotAllowed => AppError::Conflict(msg),
            WorkflowError::MissingReason => AppError::BadRequest(msg),
            WorkflowError::Store(e) => AppError::from(e),
        }
    }
}

impl From<ClusterError> for AppError {
    fn from(err: ClusterError) -> Self {
        let msg = err.to_string();
        match err {
            ClusterError::DestinationNotFound(_) => AppError::NotFound(msg),
            ClusterError::DestinationInactive(_)
            | ClusterError::InterestNotEligible(_)
            | ClusterError::IncompatibleSelection(_) => AppError::BadRequest(msg),
            ClusterError::Store(e) => AppError::from(e),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let msg = err.to_string();
        match err {
            CatalogError::NotFound(_) => AppError::NotFound(msg),
            CatalogError::Inactive(_) => AppError::BadRequest(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!("not found: {}", what)),
            // Claim and version conflicts are handled inside the engine; one
            // leaking out means a retry budget ran dry.
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
