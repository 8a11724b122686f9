//! Typed HTTP client for the expense monitor API.
//!
//! Every authenticated call takes the caller's [`Session`] explicitly. Group
//! expense splits are computed locally with [`crate::core::split`] before they
//! are submitted, so malformed splits fail fast with [`ClientError::Split`].

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Method, RequestBuilder, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::models::{
    AddExpenseRequest, BudgetBody, CreateGroupRequest, DateRangeQuery, EditExpenseRequest, ErrorResponse,
    InviteRequest, InviteResponse, JoinGroupRequest, LoginRequest, VerifyTokenRequest, VerifyTokenResponse,
};
use crate::config::CONFIG;
use crate::core::errors::SplitError;
use crate::core::models::{
    audit::GroupAudit, expense::PersonalExpense, group::Group, group_expense::GroupExpense, settlement::Settlement,
    user::UserProfile,
};
use crate::core::services::{AuthResponse, GroupExpenseUpdate, NewGroupExpense, NewUser};
use crate::core::split::{SplitInput, calculate};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not authorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rejected: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Split(#[from] SplitError),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Server(_))
    }
}

/// An authenticated user and the token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub user: UserProfile,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Session {
            token: auth.token,
            user: auth.user,
        }
    }
}

/// A group expense before its split has been computed.
#[derive(Debug, Clone)]
pub struct GroupExpenseDraft {
    pub paid_by: String,
    pub amount: f64,
    pub description: String,
    pub split: SplitInput,
    pub date: Option<DateTime<Utc>>,
}

impl GroupExpenseDraft {
    fn paid_for(&self) -> Vec<String> {
        match &self.split {
            SplitInput::Equal { participants } => participants.clone(),
            SplitInput::Percentage { shares } => shares.keys().cloned().collect(),
            SplitInput::Custom { amounts } => amounts.keys().cloned().collect(),
            SplitInput::Payment { paid_for } => paid_for.iter().cloned().collect(),
        }
    }

    fn into_request(self) -> Result<NewGroupExpense, ClientError> {
        let split_details = calculate(self.amount, &self.paid_by, &self.split)?;
        let paid_for = self.paid_for();
        Ok(NewGroupExpense {
            paid_by: self.paid_by,
            amount: self.amount,
            description: self.description,
            paid_for,
            split_method: self.split.method(),
            split_details,
            date: self.date,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the server root; `/api` is appended per request.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|err| ClientError::Server(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Client for `API_BASE_URL`.
    pub fn from_config() -> Result<Self, ClientError> {
        Self::new(&CONFIG.api_base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> Result<RequestBuilder, ClientError> {
        let endpoint = self
            .base_url
            .join(&format!("api/{}", path.trim_start_matches('/')))
            .map_err(|err| ClientError::Server(format!("invalid endpoint {path}: {err}")))?;
        debug!(%method, %endpoint, "api request");
        let builder = self.http.request(method, endpoint);
        Ok(match session {
            Some(session) => builder.bearer_auth(session.token()),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let res = check(builder.send().await?).await?;
        Ok(res.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        check(builder.send().await?).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, session: &Session) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path, Some(session))?).await
    }

    async fn with_body<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(method, path, session)?.json(body)).await
    }

    // USERS

    pub async fn register(&self, new_user: &NewUser) -> Result<Session, ClientError> {
        let auth: AuthResponse = self.with_body(Method::POST, "users/register", None, new_user).await?;
        Ok(auth.into())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.with_body(Method::POST, "users/login", None, &body).await?;
        Ok(auth.into())
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifyTokenResponse, ClientError> {
        let body = VerifyTokenRequest {
            token: token.to_string(),
        };
        self.with_body(Method::POST, "verify_token", None, &body).await
    }

    pub async fn profile(&self, session: &Session) -> Result<UserProfile, ClientError> {
        self.get("users/profile", session).await
    }

    pub async fn get_budget(&self, session: &Session) -> Result<f64, ClientError> {
        let body: BudgetBody = self.get("users/get_budget", session).await?;
        Ok(body.budget)
    }

    pub async fn update_budget(&self, session: &Session, budget: f64) -> Result<f64, ClientError> {
        let body: BudgetBody = self
            .with_body(Method::PUT, "users/update_budget", Some(session), &BudgetBody { budget })
            .await?;
        Ok(body.budget)
    }

    // PERSONAL EXPENSES

    pub async fn list_expenses(&self, session: &Session) -> Result<Vec<PersonalExpense>, ClientError> {
        self.get("personal_expenses", session).await
    }

    pub async fn add_expense(&self, session: &Session, expense: &AddExpenseRequest) -> Result<PersonalExpense, ClientError> {
        self.with_body(Method::POST, "personal_expenses/add", Some(session), expense)
            .await
    }

    pub async fn edit_expense(
        &self,
        session: &Session,
        expense_id: &str,
        edit: &EditExpenseRequest,
    ) -> Result<PersonalExpense, ClientError> {
        self.with_body(
            Method::PUT,
            &format!("personal_expenses/edit/{expense_id}"),
            Some(session),
            edit,
        )
        .await
    }

    pub async fn delete_expense(&self, session: &Session, expense_id: &str) -> Result<(), ClientError> {
        let path = format!("personal_expenses/delete/{expense_id}");
        self.send_empty(self.request(Method::DELETE, &path, Some(session))?)
            .await
    }

    pub async fn expenses_between(
        &self,
        session: &Session,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PersonalExpense>, ClientError> {
        let builder = self
            .request(Method::GET, "dashboard/get_expenses", Some(session))?
            .query(&DateRangeQuery { start, end });
        self.send(builder).await
    }

    pub async fn all_expenses(&self, session: &Session) -> Result<Vec<PersonalExpense>, ClientError> {
        self.get("dashboard/get_all_expenses", session).await
    }

    pub async fn dashboard_budget(&self, session: &Session) -> Result<f64, ClientError> {
        let body: BudgetBody = self.get("dashboard/get_budget", session).await?;
        Ok(body.budget)
    }

    // GROUPS

    pub async fn list_groups(&self, session: &Session) -> Result<Vec<Group>, ClientError> {
        self.get("groups", session).await
    }

    pub async fn create_group(&self, session: &Session, name: &str) -> Result<Group, ClientError> {
        let body = CreateGroupRequest { name: name.to_string() };
        self.with_body(Method::POST, "groups/create", Some(session), &body).await
    }

    pub async fn get_group(&self, session: &Session, group_id: &str) -> Result<Group, ClientError> {
        self.get(&format!("groups/{group_id}"), session).await
    }

    pub async fn delete_group(&self, session: &Session, group_id: &str) -> Result<(), ClientError> {
        let path = format!("groups/{group_id}/delete");
        self.send_empty(self.request(Method::DELETE, &path, Some(session))?)
            .await
    }

    pub async fn invite(&self, session: &Session, group_id: &str, email: &str) -> Result<String, ClientError> {
        let body = InviteRequest { email: email.to_string() };
        let res: InviteResponse = self
            .with_body(Method::POST, &format!("groups/{group_id}/invite"), Some(session), &body)
            .await?;
        Ok(res.api_key)
    }

    pub async fn join_group(&self, session: &Session, api_key: &str) -> Result<Group, ClientError> {
        let body = JoinGroupRequest {
            api_key: api_key.to_string(),
        };
        self.with_body(Method::POST, "groups/join", Some(session), &body).await
    }

    pub async fn group_members(&self, session: &Session, group_id: &str) -> Result<Vec<UserProfile>, ClientError> {
        self.get(&format!("groups/{group_id}/members"), session).await
    }

    pub async fn group_audits(&self, session: &Session, group_id: &str) -> Result<Vec<GroupAudit>, ClientError> {
        self.get(&format!("groups/{group_id}/audits"), session).await
    }

    // GROUP EXPENSES

    pub async fn add_group_expense(
        &self,
        session: &Session,
        group_id: &str,
        draft: GroupExpenseDraft,
    ) -> Result<GroupExpense, ClientError> {
        let body = draft.into_request()?;
        self.with_body(
            Method::POST,
            &format!("groups/{group_id}/add_expense"),
            Some(session),
            &body,
        )
        .await
    }

    pub async fn list_group_expenses(&self, session: &Session, group_id: &str) -> Result<Vec<GroupExpense>, ClientError> {
        self.get(&format!("groups/{group_id}/expenses"), session).await
    }

    /// Replaces amount, description and split of an existing group expense.
    pub async fn edit_group_expense(
        &self,
        session: &Session,
        group_id: &str,
        expense_id: &str,
        draft: GroupExpenseDraft,
    ) -> Result<GroupExpense, ClientError> {
        let request = draft.into_request()?;
        let body = GroupExpenseUpdate {
            amount: Some(request.amount),
            description: Some(request.description),
            split_method: Some(request.split_method),
            split_details: Some(request.split_details),
        };
        self.with_body(
            Method::PUT,
            &format!("groups/{group_id}/edit_expense/{expense_id}"),
            Some(session),
            &body,
        )
        .await
    }

    pub async fn delete_group_expense(&self, session: &Session, group_id: &str, expense_id: &str) -> Result<(), ClientError> {
        let path = format!("groups/{group_id}/expenses/{expense_id}");
        self.send_empty(self.request(Method::DELETE, &path, Some(session))?)
            .await
    }

    pub async fn settlement_summary(&self, session: &Session, group_id: &str) -> Result<Vec<Settlement>, ClientError> {
        self.get(&format!("groups/{group_id}/settlement_summary"), session)
            .await
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status();
    let body = res
        .json::<ErrorResponse>()
        .await
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!(status = status.as_u16(), error = %body, "api request failed");

    Err(match status.as_u16() {
        401 => ClientError::Unauthorized,
        403 => ClientError::Forbidden,
        404 => ClientError::NotFound,
        409 => ClientError::Conflict(body),
        400 | 422 => ClientError::Validation(body),
        _ => ClientError::Server(body),
    })
}
