use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core::errors::{ExpenseError, SplitError};

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct VerifyTokenResponse {
    pub user_id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, ToSchema)]
pub struct BudgetBody {
    pub budget: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct AddExpenseRequest {
    pub amount: f64,
    pub name: String,
    pub category: String,
    /// Defaults to now.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2024-06-01T12:34:56Z")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct EditExpenseRequest {
    pub amount: f64,
    pub name: String,
    /// Keeps the stored date when absent.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2024-06-01T12:34:56Z")]
    pub date: Option<DateTime<Utc>>,
}

/// Inclusive date range, `YYYY-MM-DD` on both ends.
#[derive(Serialize, Deserialize, Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    #[param(value_type = Option<String>, example = "2024-06-01")]
    pub start: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "2024-06-30")]
    pub end: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct InviteResponse {
    pub api_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct JoinGroupRequest {
    pub api_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct ApiError(pub ExpenseError);

impl From<ExpenseError> for ApiError {
    fn from(err: ExpenseError) -> Self {
        ApiError(err)
    }
}

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        ApiError(ExpenseError::Split(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ExpenseError::UsernameAlreadyRegistered(_)
            | ExpenseError::EmailAlreadyRegistered(_)
            | ExpenseError::AlreadyGroupMember(_) => StatusCode::CONFLICT,
            ExpenseError::InvalidCredentials | ExpenseError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ExpenseError::UserNotFound(_)
            | ExpenseError::ExpenseNotFound(_)
            | ExpenseError::GroupNotFound(_)
            | ExpenseError::GroupExpenseNotFound(_)
            | ExpenseError::InvalidJoinKey => StatusCode::NOT_FOUND,
            ExpenseError::NotGroupMember(_) | ExpenseError::NotGroupAdmin(_) => StatusCode::FORBIDDEN,
            ExpenseError::Split(SplitError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ExpenseError::Split(SplitError::InvalidInput(_))
            | ExpenseError::InvalidEmail(_)
            | ExpenseError::PayerIsPayee(_)
            | ExpenseError::InvalidSplitUser(_)
            | ExpenseError::InvalidInput(..) => StatusCode::BAD_REQUEST,
            ExpenseError::InternalServerError(_)
            | ExpenseError::StorageError(_)
            | ExpenseError::LoggingError(_)
            | ExpenseError::CacheError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = match &self.0 {
            ExpenseError::InvalidInput(_, field) => format!("{}: {}", field.title, field.description),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %error_message, "request failed");
        }
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
