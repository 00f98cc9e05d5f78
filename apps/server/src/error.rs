use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use loanbook_core::errors::{DatabaseError, Error as CoreError};
use loanbook_core::loans::LoanError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn loan_status(err: &LoanError) -> StatusCode {
    match err {
        LoanError::NotFound { .. } => StatusCode::NOT_FOUND,
        LoanError::InvalidScheduleInput(_) | LoanError::InvalidDrawAmount(_) => {
            StatusCode::BAD_REQUEST
        }
        LoanError::InvalidDrawState(_)
        | LoanError::DrawExceedsCommitment { .. }
        | LoanError::InvalidPaymentState(_)
        | LoanError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
    }
}

fn core_status(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::Loan(e) => (loan_status(e), e.code()),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::Database(DatabaseError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::Database(
            DatabaseError::UniqueViolation(_) | DatabaseError::ForeignKeyViolation(_),
        ) => (StatusCode::CONFLICT, "CONSTRAINT_VIOLATION"),
        CoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        CoreError::Repository(_) | CoreError::Unexpected(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Core(e) => core_status(e),
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            code,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
