use crate::core::errors::ExpenseError;
use crate::core::models::{group::Group, group_expense::GroupExpense, settlement::Settlement};
use crate::core::split::{SplitInput, calculate};
use crate::infrastructure::cache::{Cache, in_memory::InMemoryCache};
use crate::infrastructure::storage::{Storage, in_memory::InMemoryStorage};
use chrono::Utc;
use std::time::Duration;

fn group(group_id: &str) -> Group {
    Group {
        group_id: group_id.to_string(),
        group_name: "Flat".to_string(),
        admin: "alice".to_string(),
        members: Vec::new(),
        date_created: Utc::now(),
        passphrase: format!("{}-pass", group_id),
    }
}

fn expense(expense_id: &str, group_id: &str, amount: f64) -> GroupExpense {
    let input = SplitInput::Equal {
        participants: vec!["alice".to_string(), "bob".to_string()],
    };
    GroupExpense {
        group_expense_id: expense_id.to_string(),
        group_id: group_id.to_string(),
        paid_by: "alice".to_string(),
        amount,
        description: "Rent".to_string(),
        paid_for: vec!["alice".to_string(), "bob".to_string()],
        split_method: input.method(),
        split_details: calculate(amount, "alice", &input).unwrap(),
        date: Utc::now(),
    }
}

#[tokio::test]
async fn test_add_group_member() {
    let storage = InMemoryStorage::new();
    storage.save_group(group("g1")).await.unwrap();

    let updated = storage.add_group_member("g1", "bob").await.unwrap();
    assert_eq!(updated.map(|g| g.members), Some(vec!["bob".to_string()]));
    assert!(storage.add_group_member("g1", "bob").await.unwrap().is_none());
    assert!(storage.add_group_member("g1", "alice").await.unwrap().is_none());

    storage.delete_group("g1").await.unwrap();
    let gone = storage.add_group_member("g1", "carol").await;
    assert!(matches!(gone, Err(ExpenseError::GroupNotFound(_))));
    assert!(storage.get_group("g1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_group_expense_writes_require_live_rows() {
    let storage = InMemoryStorage::new();
    storage.save_group(group("g1")).await.unwrap();
    storage.save_group_expense(expense("e1", "g1", 20.0)).await.unwrap();

    storage.update_group_expense(expense("e1", "g1", 30.0)).await.unwrap();
    assert_eq!(storage.get_group_expense("e1").await.unwrap().map(|e| e.amount), Some(30.0));

    let moved = storage.update_group_expense(expense("e1", "g2", 30.0)).await;
    assert!(matches!(moved, Err(ExpenseError::GroupExpenseNotFound(_))));

    storage.delete_group_expense("e1").await.unwrap();
    let stale = storage.update_group_expense(expense("e1", "g1", 40.0)).await;
    assert!(matches!(stale, Err(ExpenseError::GroupExpenseNotFound(_))));
    assert!(storage.get_group_expense("e1").await.unwrap().is_none());

    storage.save_group_expense(expense("e2", "g1", 10.0)).await.unwrap();
    storage.delete_group("g1").await.unwrap();
    let orphan = storage.save_group_expense(expense("e3", "g1", 10.0)).await;
    assert!(matches!(orphan, Err(ExpenseError::GroupNotFound(_))));
    let stale = storage.update_group_expense(expense("e2", "g1", 15.0)).await;
    assert!(matches!(stale, Err(ExpenseError::GroupExpenseNotFound(_))));
    assert!(storage.get_group_expenses("g1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_rejects_summary_computed_before_invalidation() {
    let cache = InMemoryCache::new();
    let ttl = Duration::from_secs(60);
    let summary = vec![Settlement {
        from: "bob".to_string(),
        to: "alice".to_string(),
        amount: 10.0,
    }];

    let before = cache.settlement_generation("g1").await.unwrap();
    cache.invalidate_settlement_summary("g1").await.unwrap();
    assert!(!cache.save_settlement_summary("g1", before, &summary, ttl).await.unwrap());
    assert!(cache.get_settlement_summary("g1").await.unwrap().is_none());

    let current = cache.settlement_generation("g1").await.unwrap();
    assert_eq!(current, before + 1);
    assert!(cache.save_settlement_summary("g1", current, &summary, ttl).await.unwrap());
    assert_eq!(cache.get_settlement_summary("g1").await.unwrap(), Some(summary));

    assert_eq!(cache.settlement_generation("g2").await.unwrap(), 0);
}

#[tokio::test]
async fn test_cache_entries_expire() {
    let cache = InMemoryCache::new();
    let generation = cache.settlement_generation("g1").await.unwrap();
    assert!(cache
        .save_settlement_summary("g1", generation, &[], Duration::ZERO)
        .await
        .unwrap());
    assert!(cache.get_settlement_summary("g1").await.unwrap().is_none());
}
