use crate::core::errors::ExpenseError;
use crate::core::models::{
    audit::GroupAudit, expense::PersonalExpense, group::Group, group_expense::GroupExpense, user::User,
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    user_ids_by_username: Arc<RwLock<HashMap<String, String>>>,
    user_ids_by_email: Arc<RwLock<HashMap<String, String>>>,
    expenses: Arc<RwLock<HashMap<String, PersonalExpense>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
    group_expenses: Arc<RwLock<HashMap<String, GroupExpense>>>,
    group_audits: Arc<RwLock<HashMap<String, Vec<GroupAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user_if_not_exists(&self, user: User) -> Result<bool, ExpenseError> {
        let mut by_username = self.user_ids_by_username.write().await;
        let mut by_email = self.user_ids_by_email.write().await;
        if by_username.contains_key(&user.username) || by_email.contains_key(&user.email) {
            return Ok(false);
        }
        by_username.insert(user.username.clone(), user.id.clone());
        by_email.insert(user.email.clone(), user.id.clone());
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(true)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ExpenseError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ExpenseError> {
        let by_username = self.user_ids_by_username.read().await;
        let users = self.users.read().await;
        Ok(by_username.get(username).and_then(|id| users.get(id).cloned()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ExpenseError> {
        let by_email = self.user_ids_by_email.read().await;
        let users = self.users.read().await;
        Ok(by_email.get(email).and_then(|id| users.get(id).cloned()))
    }

    async fn update_budget(&self, user_id: &str, budget: f64) -> Result<(), ExpenseError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| ExpenseError::UserNotFound(user_id.to_string()))?;
        user.budget = budget;
        Ok(())
    }

    async fn save_expense(&self, expense: PersonalExpense) -> Result<(), ExpenseError> {
        let mut expenses = self.expenses.write().await;
        expenses.insert(expense.expense_id.clone(), expense);
        Ok(())
    }

    async fn update_expense(&self, expense: PersonalExpense) -> Result<(), ExpenseError> {
        let mut expenses = self.expenses.write().await;
        let stored = expenses
            .get_mut(&expense.expense_id)
            .ok_or_else(|| ExpenseError::ExpenseNotFound(expense.expense_id.clone()))?;
        *stored = expense;
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<PersonalExpense>, ExpenseError> {
        let expenses = self.expenses.read().await;
        Ok(expenses.get(expense_id).cloned())
    }

    async fn get_user_expenses(&self, user_id: &str) -> Result<Vec<PersonalExpense>, ExpenseError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), ExpenseError> {
        let mut expenses = self.expenses.write().await;
        expenses.remove(expense_id);
        Ok(())
    }

    async fn save_group(&self, group: Group) -> Result<(), ExpenseError> {
        let mut groups = self.groups.write().await;
        groups.insert(group.group_id.clone(), group);
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, ExpenseError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, ExpenseError> {
        let groups = self.groups.read().await;
        let mut found: Vec<Group> = groups.values().filter(|g| g.is_member(user_id)).cloned().collect();
        found.sort_by(|a, b| a.date_created.cmp(&b.date_created));
        Ok(found)
    }

    async fn passphrase_exists(&self, passphrase: &str) -> Result<bool, ExpenseError> {
        let groups = self.groups.read().await;
        Ok(groups.values().any(|g| g.passphrase == passphrase))
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<Option<Group>, ExpenseError> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| ExpenseError::GroupNotFound(group_id.to_string()))?;
        if group.is_member(user_id) {
            return Ok(None);
        }
        group.members.push(user_id.to_string());
        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), ExpenseError> {
        // Lock order is groups, then group_expenses.
        let mut groups = self.groups.write().await;
        groups.remove(group_id);
        self.group_expenses
            .write()
            .await
            .retain(|_, expense| expense.group_id != group_id);
        self.group_audits.write().await.remove(group_id);
        Ok(())
    }

    async fn save_group_expense(&self, expense: GroupExpense) -> Result<(), ExpenseError> {
        let groups = self.groups.read().await;
        if !groups.contains_key(&expense.group_id) {
            return Err(ExpenseError::GroupNotFound(expense.group_id));
        }
        let mut group_expenses = self.group_expenses.write().await;
        group_expenses.insert(expense.group_expense_id.clone(), expense);
        Ok(())
    }

    async fn update_group_expense(&self, expense: GroupExpense) -> Result<(), ExpenseError> {
        let groups = self.groups.read().await;
        let mut group_expenses = self.group_expenses.write().await;
        let stored = group_expenses
            .get_mut(&expense.group_expense_id)
            .filter(|stored| stored.group_id == expense.group_id && groups.contains_key(&stored.group_id))
            .ok_or_else(|| ExpenseError::GroupExpenseNotFound(expense.group_expense_id.clone()))?;
        *stored = expense;
        Ok(())
    }

    async fn get_group_expense(&self, expense_id: &str) -> Result<Option<GroupExpense>, ExpenseError> {
        let group_expenses = self.group_expenses.read().await;
        Ok(group_expenses.get(expense_id).cloned())
    }

    async fn get_group_expenses(&self, group_id: &str) -> Result<Vec<GroupExpense>, ExpenseError> {
        let group_expenses = self.group_expenses.read().await;
        Ok(group_expenses
            .values()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn delete_group_expense(&self, expense_id: &str) -> Result<(), ExpenseError> {
        let mut group_expenses = self.group_expenses.write().await;
        group_expenses.remove(expense_id);
        Ok(())
    }

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), ExpenseError> {
        let mut group_audits = self.group_audits.write().await;
        group_audits
            .entry(audit.group_id.clone())
            .or_insert_with(Vec::new)
            .push(audit);
        Ok(())
    }

    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, ExpenseError> {
        let group_audits = self.group_audits.read().await;
        Ok(group_audits.get(group_id).cloned().unwrap_or_default())
    }
}
