use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::{address_service::SubmissionError, role_registry::RoleError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    BadRequest,
    NotFound,
    Internal,
    ServiceUnavailable,

    // 业务错误码
    UnrecognizedFormat,
    NoRoleAssigned,
    DuplicateRoleConflict,
    AddressAlreadySet,
    VerificationUnavailable,
    PersistenceFailure,
    Blacklisted,
    RoleAlreadyChosen,
    RoleAlreadyTaken,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Internal => "internal",
            AppErrorCode::ServiceUnavailable => "service_unavailable",
            AppErrorCode::UnrecognizedFormat => "unrecognized_format",
            AppErrorCode::NoRoleAssigned => "no_role_assigned",
            AppErrorCode::DuplicateRoleConflict => "duplicate_role_conflict",
            AppErrorCode::AddressAlreadySet => "address_already_set",
            AppErrorCode::VerificationUnavailable => "verification_unavailable",
            AppErrorCode::PersistenceFailure => "persistence_failure",
            AppErrorCode::Blacklisted => "blacklisted",
            AppErrorCode::RoleAlreadyChosen => "role_already_chosen",
            AppErrorCode::RoleAlreadyTaken => "role_already_taken",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    trace_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
            trace_id: self.trace_id.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::ServiceUnavailable,
            StatusCode::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        let message = err.to_string();
        match err {
            SubmissionError::UnrecognizedFormat => {
                Self::new(AppErrorCode::UnrecognizedFormat, StatusCode::BAD_REQUEST, message)
            }
            SubmissionError::NoRoleAssigned => {
                Self::new(AppErrorCode::NoRoleAssigned, StatusCode::FORBIDDEN, message)
            }
            SubmissionError::DuplicateRoleConflict { .. } => Self::new(
                AppErrorCode::DuplicateRoleConflict,
                StatusCode::CONFLICT,
                message,
            ),
            SubmissionError::AddressAlreadySet(_) => {
                Self::new(AppErrorCode::AddressAlreadySet, StatusCode::CONFLICT, message)
            }
            SubmissionError::Blacklisted(_) => {
                Self::new(AppErrorCode::Blacklisted, StatusCode::FORBIDDEN, message)
            }
            SubmissionError::VerificationUnavailable(_) => Self::new(
                AppErrorCode::VerificationUnavailable,
                StatusCode::SERVICE_UNAVAILABLE,
                message,
            ),
            SubmissionError::PersistenceFailure(_) => Self::new(
                AppErrorCode::PersistenceFailure,
                StatusCode::SERVICE_UNAVAILABLE,
                message,
            ),
        }
    }
}

impl From<RoleError> for AppError {
    fn from(err: RoleError) -> Self {
        let message = err.to_string();
        match err {
            RoleError::RoleAlreadyChosen(_) => {
                Self::new(AppErrorCode::RoleAlreadyChosen, StatusCode::CONFLICT, message)
            }
            RoleError::RoleAlreadyTaken(_) => {
                Self::new(AppErrorCode::RoleAlreadyTaken, StatusCode::CONFLICT, message)
            }
            RoleError::Persistence(_) => Self::new(
                AppErrorCode::PersistenceFailure,
                StatusCode::SERVICE_UNAVAILABLE,
                message,
            ),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "Unhandled internal error");
        Self::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_error_mapping() {
        let err: AppError = SubmissionError::UnrecognizedFormat.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, AppErrorCode::UnrecognizedFormat);

        let err: AppError = SubmissionError::PersistenceFailure("disk full".into()).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code.as_str(), "persistence_failure");

        let err: AppError = SubmissionError::NoRoleAssigned.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_with_trace_id() {
        let err = AppError::bad_request("bad").with_trace_id("trace-1".into());
        assert_eq!(err.trace_id.as_deref(), Some("trace-1"));
    }
}
