use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Failures of the split calculator.
#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum SplitError {
    /// The inputs cannot produce a split at all (no participants, negative amounts, zero total).
    #[error("Invalid split input: {0}")]
    InvalidInput(String),
    /// The inputs are well formed but violate a split invariant.
    #[error("Split validation failed: {0}")]
    Validation(String),
}

#[derive(Error, Debug, Serialize)]
pub enum ExpenseError {
    #[error("Username {0} already registered")]
    UsernameAlreadyRegistered(String),
    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Expense {0} not found")]
    ExpenseNotFound(String),
    #[error("Group {0} not found")]
    GroupNotFound(String),
    #[error("Group expense {0} not found")]
    GroupExpenseNotFound(String),
    #[error("User {0} is already a group member")]
    AlreadyGroupMember(String),
    #[error("User {0} is not a group member")]
    NotGroupMember(String),
    #[error("User {0} is not group admin")]
    NotGroupAdmin(String),
    #[error("Invalid join key")]
    InvalidJoinKey,
    #[error("Payer {0} cannot also be paid for in a payment split")]
    PayerIsPayee(String),
    #[error("Invalid split user: {0}")]
    InvalidSplitUser(String),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Cache error: {0}")]
    CacheError(String),
}
