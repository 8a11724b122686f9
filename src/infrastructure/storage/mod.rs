use crate::core::errors::ExpenseError;
use crate::core::models::{
    audit::GroupAudit, expense::PersonalExpense, group::Group, group_expense::GroupExpense, user::User,
};
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores the user unless the username or email is taken; returns `false` in that case.
    async fn create_user_if_not_exists(&self, user: User) -> Result<bool, ExpenseError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ExpenseError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ExpenseError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ExpenseError>;
    async fn update_budget(&self, user_id: &str, budget: f64) -> Result<(), ExpenseError>;

    async fn save_expense(&self, expense: PersonalExpense) -> Result<(), ExpenseError>;
    /// Replaces a stored expense; fails with `ExpenseNotFound` once it has been deleted.
    async fn update_expense(&self, expense: PersonalExpense) -> Result<(), ExpenseError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<PersonalExpense>, ExpenseError>;
    async fn get_user_expenses(&self, user_id: &str) -> Result<Vec<PersonalExpense>, ExpenseError>;
    async fn delete_expense(&self, expense_id: &str) -> Result<(), ExpenseError>;

    async fn save_group(&self, group: Group) -> Result<(), ExpenseError>;
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, ExpenseError>;
    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, ExpenseError>;
    async fn passphrase_exists(&self, passphrase: &str) -> Result<bool, ExpenseError>;
    /// Adds `user_id` to the group's members under the group lock and returns the updated
    /// group, or `None` if the user already belongs to it. Fails with `GroupNotFound`.
    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<Option<Group>, ExpenseError>;
    /// Removes the group together with its expenses and audit trail.
    async fn delete_group(&self, group_id: &str) -> Result<(), ExpenseError>;

    /// Fails with `GroupNotFound` if the expense's group no longer exists.
    async fn save_group_expense(&self, expense: GroupExpense) -> Result<(), ExpenseError>;
    /// Replaces a stored group expense; fails with `GroupExpenseNotFound` once it has been
    /// deleted, alone or with its group.
    async fn update_group_expense(&self, expense: GroupExpense) -> Result<(), ExpenseError>;
    async fn get_group_expense(&self, expense_id: &str) -> Result<Option<GroupExpense>, ExpenseError>;
    async fn get_group_expenses(&self, group_id: &str) -> Result<Vec<GroupExpense>, ExpenseError>;
    async fn delete_group_expense(&self, expense_id: &str) -> Result<(), ExpenseError>;

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), ExpenseError>;
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, ExpenseError>;
}

pub mod in_memory;
