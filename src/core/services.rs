use crate::auth::jwt::{Claims, JwtService};
use crate::constants::constants::{
    BUDGET_UPDATED, EXPENSE_ADDED, EXPENSE_DELETED, EXPENSE_EDITED, GROUP_CREATED, GROUP_DELETED,
    GROUP_EXPENSE_ADDED, GROUP_EXPENSE_DELETED, GROUP_EXPENSE_EDITED, MAX_AMOUNT, MEMBER_INVITED, MEMBER_JOINED,
    PASSPHRASE_LENGTH, SETTLEMENT_CACHE_TTL_SECS, SETTLEMENTS_QUERIED, SPLIT_TOLERANCE, USER_LOGGED_IN,
    USER_REGISTERED,
};
use crate::core::errors::{ExpenseError, FieldError};
use crate::core::models::{
    audit::{AppLog, GroupAudit},
    expense::PersonalExpense,
    group::Group,
    group_expense::GroupExpense,
    settlement::Settlement,
    user::{User, UserProfile},
};
use crate::core::settlement::settle_expenses;
use crate::core::split::{SplitDetail, SplitMethod};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use base64::{Engine, engine::general_purpose::URL_SAFE};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// A group expense as submitted by a member.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct NewGroupExpense {
    pub paid_by: String,
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub paid_for: Vec<String>,
    pub split_method: SplitMethod,
    pub split_details: SplitDetail,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2024-06-01T12:34:56Z")]
    pub date: Option<DateTime<Utc>>,
}

/// Fields left as `None` keep their stored value.
#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct GroupExpenseUpdate {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub split_method: Option<SplitMethod>,
    pub split_details: Option<SplitDetail>,
}

pub struct ExpenseService<L: LoggingService, S: Storage, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
    jwt_service: JwtService,
    default_budget: f64,
    bcrypt_cost: u32,
}

impl<L: LoggingService, S: Storage, C: Cache> ExpenseService<L, S, C> {
    pub fn new(storage: S, logging: L, cache: C, jwt_secret: String) -> Self {
        ExpenseService {
            storage,
            logging,
            cache,
            jwt_service: JwtService::new(jwt_secret),
            default_budget: 1000.0,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_token_ttl_hours(mut self, hours: u64) -> Self {
        self.jwt_service = self.jwt_service.with_ttl_hours(hours);
        self
    }

    pub fn with_default_budget(mut self, budget: f64) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ExpenseError> {
        self.jwt_service.validate_token(token)
    }

    async fn require_user(&self, user_id: &str) -> Result<User, ExpenseError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| ExpenseError::UserNotFound(user_id.to_string()))
    }

    async fn validate_group_membership(&self, group_id: &str, user_id: &str) -> Result<Group, ExpenseError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| ExpenseError::GroupNotFound(group_id.to_string()))?;
        if !group.is_member(user_id) {
            return Err(ExpenseError::NotGroupMember(user_id.to_string()));
        }
        Ok(group)
    }

    async fn validate_group_admin(&self, group_id: &str, user_id: &str) -> Result<Group, ExpenseError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| ExpenseError::GroupNotFound(group_id.to_string()))?;
        if !group.is_admin(user_id) {
            return Err(ExpenseError::NotGroupAdmin(user_id.to_string()));
        }
        Ok(group)
    }

    /// Records `action` in the app log and, for group actions, in the group's audit trail.
    /// `log_details` must be a JSON object; nothing is recorded otherwise.
    pub(crate) async fn log_and_audit(
        &self,
        group_id: Option<&str>,
        action: &str,
        log_details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), ExpenseError> {
        let details = serde_json::from_value(log_details.clone())
            .map_err(|e| ExpenseError::LoggingError(format!("Audit details must be a JSON object: {}", e)))?;
        self.logging.log_action(action, log_details, user_id).await?;
        if let Some(gid) = group_id {
            self.storage
                .save_group_audit(GroupAudit {
                    id: Uuid::new_v4().to_string(),
                    group_id: gid.to_string(),
                    action: action.to_string(),
                    user_id: user_id.map(String::from),
                    details,
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), ExpenseError> {
        if value.trim().is_empty() {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(field, format!("Invalid {}", field), format!("{} cannot be empty", field)),
            ));
        }
        if value.len() > max_length {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("{} Too Long", field),
                    format!("{} cannot exceed {} characters", field, max_length),
                ),
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("Invalid {}", field),
                    format!("{} contains invalid characters", field),
                ),
            ));
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: f64) -> Result<(), ExpenseError> {
        if !amount.is_finite() {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Invalid Amount", "Amount must be a finite number"),
            ));
        }
        if amount <= 0.0 {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Invalid Amount", "Amount must be greater than 0"),
            ));
        }
        if amount > MAX_AMOUNT {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Amount Too Large", "Amount cannot exceed 1,000,000"),
            ));
        }
        let cents = amount * 100.0;
        if (cents - cents.round()).abs() > 1e-6 {
            return Err(ExpenseError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Invalid Amount", "Amount cannot have more than 2 decimal places"),
            ));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> Result<(), ExpenseError> {
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err(ExpenseError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    // USERS

    pub async fn register_user(&self, new_user: NewUser) -> Result<AuthResponse, ExpenseError> {
        self.validate_string_input("username", &new_user.username, 50)?;
        self.validate_string_input("first_name", &new_user.first_name, 100)?;
        self.validate_string_input("last_name", &new_user.last_name, 100)?;
        self.validate_email(&new_user.email)?;
        if new_user.password.is_empty() {
            return Err(ExpenseError::InvalidInput(
                "password".to_string(),
                FieldError::new("password", "Invalid password", "Password cannot be empty"),
            ));
        }

        if self.storage.get_user_by_username(&new_user.username).await?.is_some() {
            return Err(ExpenseError::UsernameAlreadyRegistered(new_user.username));
        }
        if self.storage.get_user_by_email(&new_user.email).await?.is_some() {
            return Err(ExpenseError::EmailAlreadyRegistered(new_user.email));
        }

        let password = bcrypt::hash(&new_user.password, self.bcrypt_cost)
            .map_err(|e| ExpenseError::InternalServerError(format!("Password hashing error: {}", e)))?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password,
            budget: self.default_budget,
        };

        // A concurrent registration may have claimed the name in between.
        if !self.storage.create_user_if_not_exists(user.clone()).await? {
            return Err(ExpenseError::UsernameAlreadyRegistered(user.username));
        }

        self.log_and_audit(
            None,
            USER_REGISTERED,
            json!({ "user_id": user.id, "username": user.username, "email": user.email }),
            Some(user.id.as_str()),
        )
        .await?;
        info!(user_id = %user.id, username = %user.username, "user registered");

        let token = self.jwt_service.generate_token(&user.id, &user.username)?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ExpenseError> {
        let user = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or(ExpenseError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &user.password)
            .map_err(|e| ExpenseError::InternalServerError(format!("Password verification error: {}", e)))?;
        if !valid {
            warn!(username, "login rejected");
            return Err(ExpenseError::InvalidCredentials);
        }

        self.log_and_audit(None, USER_LOGGED_IN, json!({ "user_id": user.id }), Some(user.id.as_str()))
            .await?;
        let token = self.jwt_service.generate_token(&user.id, &user.username)?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, ExpenseError> {
        self.storage.get_user(user_id).await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ExpenseError> {
        Ok(self.require_user(user_id).await?.profile())
    }

    pub async fn get_budget(&self, user_id: &str) -> Result<f64, ExpenseError> {
        Ok(self.require_user(user_id).await?.budget)
    }

    pub async fn update_budget(&self, user_id: &str, budget: f64) -> Result<f64, ExpenseError> {
        if !budget.is_finite() || budget < 0.0 {
            return Err(ExpenseError::InvalidInput(
                "budget".to_string(),
                FieldError::new("budget", "Invalid Budget", "Budget must be a non-negative number"),
            ));
        }
        self.require_user(user_id).await?;
        self.storage.update_budget(user_id, budget).await?;
        self.log_and_audit(None, BUDGET_UPDATED, json!({ "budget": budget }), Some(user_id))
            .await?;
        Ok(budget)
    }

    // PERSONAL EXPENSES

    pub async fn add_expense(
        &self,
        user_id: &str,
        amount: f64,
        name: String,
        date: Option<DateTime<Utc>>,
        category: String,
    ) -> Result<PersonalExpense, ExpenseError> {
        self.require_user(user_id).await?;
        self.validate_amount_input("amount", amount)?;
        self.validate_string_input("name", &name, 255)?;
        self.validate_string_input("category", &category, 100)?;

        let expense = PersonalExpense {
            expense_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            name,
            date: date.unwrap_or_else(Utc::now),
            category,
        };
        self.storage.save_expense(expense.clone()).await?;

        self.log_and_audit(
            None,
            EXPENSE_ADDED,
            json!({ "expense_id": expense.expense_id, "amount": expense.amount, "category": expense.category }),
            Some(user_id),
        )
        .await?;
        Ok(expense)
    }

    async fn owned_expense(&self, user_id: &str, expense_id: &str) -> Result<PersonalExpense, ExpenseError> {
        // Another user's expense is reported as missing, not forbidden.
        self.storage
            .get_expense(expense_id)
            .await?
            .filter(|e| e.user_id == user_id)
            .ok_or_else(|| ExpenseError::ExpenseNotFound(expense_id.to_string()))
    }

    /// Newest first.
    pub async fn list_expenses(&self, user_id: &str) -> Result<Vec<PersonalExpense>, ExpenseError> {
        self.require_user(user_id).await?;
        let mut expenses = self.storage.get_user_expenses(user_id).await?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    /// Oldest first; both bounds are optional and the end day is inclusive.
    pub async fn expenses_between(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PersonalExpense>, ExpenseError> {
        self.require_user(user_id).await?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ExpenseError::InvalidInput(
                    "start".to_string(),
                    FieldError::new("start", "Invalid Range", "start date must not be after end date"),
                ));
            }
        }

        let from = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let until = end
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());

        let mut expenses: Vec<PersonalExpense> = self
            .storage
            .get_user_expenses(user_id)
            .await?
            .into_iter()
            .filter(|e| from.is_none_or(|from| e.date >= from))
            .filter(|e| until.is_none_or(|until| e.date < until))
            .collect();
        expenses.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(expenses)
    }

    pub async fn edit_expense(
        &self,
        user_id: &str,
        expense_id: &str,
        amount: f64,
        name: String,
        date: Option<DateTime<Utc>>,
    ) -> Result<PersonalExpense, ExpenseError> {
        let mut expense = self.owned_expense(user_id, expense_id).await?;
        self.validate_amount_input("amount", amount)?;
        self.validate_string_input("name", &name, 255)?;

        expense.amount = amount;
        expense.name = name;
        if let Some(date) = date {
            expense.date = date;
        }
        self.storage.update_expense(expense.clone()).await?;

        self.log_and_audit(
            None,
            EXPENSE_EDITED,
            json!({ "expense_id": expense_id, "amount": amount }),
            Some(user_id),
        )
        .await?;
        Ok(expense)
    }

    pub async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<(), ExpenseError> {
        self.owned_expense(user_id, expense_id).await?;
        self.storage.delete_expense(expense_id).await?;
        self.log_and_audit(None, EXPENSE_DELETED, json!({ "expense_id": expense_id }), Some(user_id))
            .await?;
        Ok(())
    }

    // GROUPS

    async fn generate_passphrase(&self) -> Result<String, ExpenseError> {
        loop {
            let candidate: String = Uuid::new_v4().simple().to_string().chars().take(PASSPHRASE_LENGTH).collect();
            if !self.storage.passphrase_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
    }

    pub async fn create_group(&self, user_id: &str, name: String) -> Result<Group, ExpenseError> {
        self.require_user(user_id).await?;
        self.validate_string_input("group_name", &name, 100)?;

        let group = Group {
            group_id: Uuid::new_v4().to_string(),
            group_name: name,
            admin: user_id.to_string(),
            members: Vec::new(),
            date_created: Utc::now(),
            passphrase: self.generate_passphrase().await?,
        };
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(group.group_id.as_str()),
            GROUP_CREATED,
            json!({ "group_id": group.group_id, "name": group.group_name }),
            Some(user_id),
        )
        .await?;
        info!(group_id = %group.group_id, admin = %user_id, "group created");
        Ok(group)
    }

    pub async fn get_group(&self, user_id: &str, group_id: &str) -> Result<Group, ExpenseError> {
        self.validate_group_membership(group_id, user_id).await
    }

    pub async fn list_user_groups(&self, user_id: &str) -> Result<Vec<Group>, ExpenseError> {
        self.require_user(user_id).await?;
        self.storage.get_user_groups(user_id).await
    }

    pub async fn delete_group(&self, user_id: &str, group_id: &str) -> Result<(), ExpenseError> {
        let group = self.validate_group_admin(group_id, user_id).await?;
        self.storage.delete_group(group_id).await?;
        self.cache.invalidate_settlement_summary(group_id).await?;

        // The group's own audit trail goes with it; keep the deletion in the app log.
        self.log_and_audit(
            None,
            GROUP_DELETED,
            json!({ "group_id": group_id, "name": group.group_name }),
            Some(user_id),
        )
        .await?;
        Ok(())
    }

    pub async fn group_members(&self, user_id: &str, group_id: &str) -> Result<Vec<UserProfile>, ExpenseError> {
        let group = self.validate_group_membership(group_id, user_id).await?;
        let profiles = group
            .all_members()
            .into_iter()
            .map(|id| async move { self.get_profile(id).await })
            .collect::<Vec<_>>();
        futures::future::try_join_all(profiles).await
    }

    /// Issues the key an invitee uses to join; delivery of the key is up to the caller.
    pub async fn invite_to_group(&self, user_id: &str, group_id: &str, email: &str) -> Result<String, ExpenseError> {
        let group = self.validate_group_membership(group_id, user_id).await?;
        self.validate_email(email)?;

        if let Some(invitee) = self.storage.get_user_by_email(email).await? {
            if group.is_member(&invitee.id) {
                return Err(ExpenseError::AlreadyGroupMember(email.to_string()));
            }
        }

        let api_key = encode_join_key(&group.group_id, &group.passphrase);
        self.log_and_audit(
            Some(group_id),
            MEMBER_INVITED,
            json!({ "group_id": group_id, "group_name": group.group_name, "email": email }),
            Some(user_id),
        )
        .await?;
        info!(group_id, email, "group invitation issued");
        Ok(api_key)
    }

    pub async fn join_group(&self, user_id: &str, api_key: &str) -> Result<Group, ExpenseError> {
        self.require_user(user_id).await?;
        let (group_id, passphrase) = decode_join_key(api_key)?;

        self.storage
            .get_group(&group_id)
            .await?
            .filter(|g| g.passphrase == passphrase)
            .ok_or(ExpenseError::InvalidJoinKey)?;

        let group = match self.storage.add_group_member(&group_id, user_id).await {
            Ok(Some(group)) => group,
            Ok(None) => return Err(ExpenseError::AlreadyGroupMember(user_id.to_string())),
            // Deleted since the key was checked.
            Err(ExpenseError::GroupNotFound(_)) => return Err(ExpenseError::InvalidJoinKey),
            Err(e) => return Err(e),
        };

        self.log_and_audit(
            Some(group.group_id.as_str()),
            MEMBER_JOINED,
            json!({ "group_id": group.group_id, "user_id": user_id }),
            Some(user_id),
        )
        .await?;
        Ok(group)
    }

    pub async fn get_group_audits(&self, user_id: &str, group_id: &str) -> Result<Vec<GroupAudit>, ExpenseError> {
        self.validate_group_membership(group_id, user_id).await?;
        self.storage.get_group_audits(group_id).await
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, ExpenseError> {
        self.logging.get_logs().await
    }

    pub async fn get_app_logs_by_action(&self, action: &str) -> Result<Vec<AppLog>, ExpenseError> {
        self.logging.get_logs_by_action(action).await
    }

    // GROUP EXPENSES

    fn validate_group_expense(&self, group: &Group, expense: &mut GroupExpense) -> Result<(), ExpenseError> {
        self.validate_string_input("description", &expense.description, 255)?;
        self.validate_amount_input("amount", expense.amount)?;

        if !group.is_member(&expense.paid_by) {
            return Err(ExpenseError::NotGroupMember(expense.paid_by.clone()));
        }

        let details = &mut expense.split_details;
        if (details.amount - expense.amount).abs() > SPLIT_TOLERANCE {
            return Err(ExpenseError::InvalidInput(
                "split_details.amount".to_string(),
                FieldError::new(
                    "split_details.amount",
                    "Invalid Split",
                    format!("split total {} does not match amount {}", details.amount, expense.amount),
                ),
            ));
        }
        details.amount = expense.amount;
        details.payer = expense.paid_by.clone();
        details.verify(expense.split_method)?;

        if expense.paid_for.is_empty() {
            expense.paid_for = details.shares.keys().cloned().collect();
        }

        if let Some(stranger) = details
            .participants()
            .chain(expense.paid_for.iter().map(String::as_str))
            .find(|id| !group.is_member(id))
        {
            return Err(ExpenseError::InvalidSplitUser(stranger.to_string()));
        }

        if expense.split_method == SplitMethod::Payment
            && (expense.paid_for.contains(&expense.paid_by) || details.shares.contains_key(&expense.paid_by))
        {
            return Err(ExpenseError::PayerIsPayee(expense.paid_by.clone()));
        }

        // paid_for is kept sorted and deduplicated, like the share keys.
        if !expense.paid_for.iter().eq(details.shares.keys()) {
            return Err(ExpenseError::InvalidInput(
                "paid_for".to_string(),
                FieldError::new(
                    "paid_for",
                    "Invalid Split",
                    "paid_for must list exactly the members the split assigns shares to",
                ),
            ));
        }
        Ok(())
    }

    async fn group_expense_in(&self, group_id: &str, expense_id: &str) -> Result<GroupExpense, ExpenseError> {
        self.storage
            .get_group_expense(expense_id)
            .await?
            .filter(|e| e.group_id == group_id)
            .ok_or_else(|| ExpenseError::GroupExpenseNotFound(expense_id.to_string()))
    }

    pub async fn add_group_expense(
        &self,
        user_id: &str,
        group_id: &str,
        new_expense: NewGroupExpense,
    ) -> Result<GroupExpense, ExpenseError> {
        let group = self.validate_group_membership(group_id, user_id).await?;

        let mut paid_for = new_expense.paid_for;
        paid_for.sort();
        paid_for.dedup();
        let mut expense = GroupExpense {
            group_expense_id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            paid_by: new_expense.paid_by,
            amount: new_expense.amount,
            description: new_expense.description,
            paid_for,
            split_method: new_expense.split_method,
            split_details: new_expense.split_details,
            date: new_expense.date.unwrap_or_else(Utc::now),
        };
        self.validate_group_expense(&group, &mut expense)?;

        self.storage.save_group_expense(expense.clone()).await?;
        self.cache.invalidate_settlement_summary(group_id).await?;

        self.log_and_audit(
            Some(group_id),
            GROUP_EXPENSE_ADDED,
            json!({
                "group_expense_id": expense.group_expense_id,
                "paid_by": expense.paid_by,
                "amount": expense.amount,
                "description": expense.description,
                "split_method": expense.split_method.to_string(),
            }),
            Some(user_id),
        )
        .await?;
        Ok(expense)
    }

    /// Newest first.
    pub async fn list_group_expenses(&self, user_id: &str, group_id: &str) -> Result<Vec<GroupExpense>, ExpenseError> {
        self.validate_group_membership(group_id, user_id).await?;
        let mut expenses = self.storage.get_group_expenses(group_id).await?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    pub async fn edit_group_expense(
        &self,
        user_id: &str,
        group_id: &str,
        expense_id: &str,
        update: GroupExpenseUpdate,
    ) -> Result<GroupExpense, ExpenseError> {
        let group = self.validate_group_membership(group_id, user_id).await?;
        let mut expense = self.group_expense_in(group_id, expense_id).await?;

        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(description) = update.description {
            expense.description = description;
        }
        if let Some(method) = update.split_method {
            expense.split_method = method;
        }
        match update.split_details {
            Some(details) => {
                expense.paid_for = details.shares.keys().cloned().collect();
                expense.split_details = details;
            }
            // Percentages still apply; the stored total follows the new amount.
            None => expense.split_details.amount = expense.amount,
        }
        self.validate_group_expense(&group, &mut expense)?;

        self.storage.update_group_expense(expense.clone()).await?;
        self.cache.invalidate_settlement_summary(group_id).await?;

        self.log_and_audit(
            Some(group_id),
            GROUP_EXPENSE_EDITED,
            json!({
                "group_expense_id": expense.group_expense_id,
                "amount": expense.amount,
                "description": expense.description,
                "split_method": expense.split_method.to_string(),
            }),
            Some(user_id),
        )
        .await?;
        Ok(expense)
    }

    pub async fn delete_group_expense(&self, user_id: &str, group_id: &str, expense_id: &str) -> Result<(), ExpenseError> {
        self.validate_group_membership(group_id, user_id).await?;
        let expense = self.group_expense_in(group_id, expense_id).await?;

        self.storage.delete_group_expense(expense_id).await?;
        self.cache.invalidate_settlement_summary(group_id).await?;

        self.log_and_audit(
            Some(group_id),
            GROUP_EXPENSE_DELETED,
            json!({
                "group_expense_id": expense_id,
                "amount": expense.amount,
                "description": expense.description,
            }),
            Some(user_id),
        )
        .await?;
        Ok(())
    }

    /// Who pays whom to clear the group's balances, by username.
    pub async fn settlement_summary(&self, user_id: &str, group_id: &str) -> Result<Vec<Settlement>, ExpenseError> {
        self.validate_group_membership(group_id, user_id).await?;

        if let Some(cached) = self.cache.get_settlement_summary(group_id).await? {
            return Ok(cached);
        }
        // Read before loading so a mutation that lands mid-computation keeps this result out of the cache.
        let generation = self.cache.settlement_generation(group_id).await?;

        let details: Vec<SplitDetail> = self
            .storage
            .get_group_expenses(group_id)
            .await?
            .into_iter()
            .map(|e| e.split_details)
            .collect();

        let mut settlements = Vec::new();
        for settlement in settle_expenses(&details) {
            settlements.push(Settlement {
                from: self.require_user(&settlement.from).await?.username,
                to: self.require_user(&settlement.to).await?.username,
                amount: settlement.amount,
            });
        }

        let cached = self
            .cache
            .save_settlement_summary(
                group_id,
                generation,
                &settlements,
                Duration::from_secs(SETTLEMENT_CACHE_TTL_SECS),
            )
            .await?;
        if !cached {
            debug!(group_id, "expenses changed while settling; summary not cached");
        }
        self.log_and_audit(
            Some(group_id),
            SETTLEMENTS_QUERIED,
            json!({ "group_id": group_id, "settlements": settlements.len() }),
            Some(user_id),
        )
        .await?;
        Ok(settlements)
    }
}

/// URL-safe base64 of `group_id:passphrase`.
pub fn encode_join_key(group_id: &str, passphrase: &str) -> String {
    URL_SAFE.encode(format!("{}:{}", group_id, passphrase))
}

pub fn decode_join_key(api_key: &str) -> Result<(String, String), ExpenseError> {
    let bytes = URL_SAFE
        .decode(api_key.trim())
        .map_err(|_| ExpenseError::InvalidJoinKey)?;
    let decoded = String::from_utf8(bytes).map_err(|_| ExpenseError::InvalidJoinKey)?;
    match decoded.split_once(':') {
        Some((group_id, passphrase)) if !group_id.is_empty() && !passphrase.is_empty() => {
            Ok((group_id.to_string(), passphrase.to_string()))
        }
        _ => Err(ExpenseError::InvalidJoinKey),
    }
}
