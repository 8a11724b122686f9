use crate::api::app;
use crate::api::models::{AddExpenseRequest, EditExpenseRequest};
use crate::client::{ApiClient, ClientError, GroupExpenseDraft, Session};
use crate::config::CONFIG;
use crate::core::errors::SplitError;
use crate::core::split::{ShareMap, SplitInput, SplitMethod};
use crate::tests::{create_test_service, new_user};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

async fn spawn_app() -> ApiClient {
    let service = Arc::new(create_test_service());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(service, "http://localhost:3000"))
            .await
            .unwrap();
    });
    ApiClient::new(&format!("http://{}", addr)).unwrap()
}

async fn signup(client: &ApiClient, username: &str) -> Session {
    client.register(&new_user(username)).await.unwrap()
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let client = spawn_app().await;
    let session = signup(&client, "alice").await;
    assert_eq!(session.user.username, "alice");

    let again = client.login("alice", "alice-password").await.unwrap();
    assert_eq!(again.user, session.user);

    let profile = client.profile(&again).await.unwrap();
    assert_eq!(profile.email, "alice@example.com");

    let verified = client.verify_token(session.token()).await.unwrap();
    assert_eq!(verified.user_id, session.user.user_id);

    let duplicate = client.register(&new_user("alice")).await;
    assert!(matches!(duplicate, Err(ClientError::Conflict(_))));

    let wrong = client.login("alice", "wrong").await;
    assert!(matches!(wrong, Err(ClientError::Unauthorized)));

    let garbage = client.verify_token("not-a-token").await;
    assert!(matches!(garbage, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn test_budget_and_personal_expenses() {
    let client = spawn_app().await;
    let session = signup(&client, "alice").await;

    assert_eq!(client.get_budget(&session).await.unwrap(), 1000.0);
    assert_eq!(client.update_budget(&session, 750.0).await.unwrap(), 750.0);
    assert_eq!(client.dashboard_budget(&session).await.unwrap(), 750.0);

    let june = client
        .add_expense(
            &session,
            &AddExpenseRequest {
                amount: 18.4,
                name: "Cinema".to_string(),
                category: "Leisure".to_string(),
                date: Some(Utc.with_ymd_and_hms(2024, 6, 30, 21, 0, 0).unwrap()),
            },
        )
        .await
        .unwrap();
    let july = client
        .add_expense(
            &session,
            &AddExpenseRequest {
                amount: 3.2,
                name: "Coffee".to_string(),
                category: "Food".to_string(),
                date: Some(Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap()),
            },
        )
        .await
        .unwrap();

    let listed = client.list_expenses(&session).await.unwrap();
    assert_eq!(listed, vec![july.clone(), june.clone()]);

    let in_june = client
        .expenses_between(
            &session,
            NaiveDate::from_ymd_opt(2024, 6, 1),
            NaiveDate::from_ymd_opt(2024, 6, 30),
        )
        .await
        .unwrap();
    assert_eq!(in_june, vec![june.clone()]);

    let edited = client
        .edit_expense(
            &session,
            &june.expense_id,
            &EditExpenseRequest {
                amount: 20.0,
                name: "Cinema and snacks".to_string(),
                date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.date, june.date);

    client.delete_expense(&session, &july.expense_id).await.unwrap();
    assert_eq!(client.all_expenses(&session).await.unwrap(), vec![edited]);

    let missing = client.delete_expense(&session, &july.expense_id).await;
    assert!(matches!(missing, Err(ClientError::NotFound)));

    let invalid = client
        .add_expense(
            &session,
            &AddExpenseRequest {
                amount: -1.0,
                name: "Refund".to_string(),
                category: "Misc".to_string(),
                date: None,
            },
        )
        .await;
    assert!(matches!(invalid, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn test_group_flow_end_to_end() {
    let client = spawn_app().await;
    let alice = signup(&client, "alice").await;
    let bob = signup(&client, "bob").await;
    let carol = signup(&client, "carol").await;

    let group = client.create_group(&alice, "Ski trip").await.unwrap();
    let key = client.invite(&alice, &group.group_id, "bob@example.com").await.unwrap();
    let joined = client.join_group(&bob, &key).await.unwrap();
    assert_eq!(joined.members, vec![bob.user.user_id.clone()]);

    let forbidden = client.get_group(&carol, &group.group_id).await;
    assert!(matches!(forbidden, Err(ClientError::Forbidden)));

    let draft = GroupExpenseDraft {
        paid_by: alice.user.user_id.clone(),
        amount: 80.0,
        description: "Cabin".to_string(),
        split: SplitInput::Equal {
            participants: vec![alice.user.user_id.clone(), bob.user.user_id.clone()],
        },
        date: None,
    };
    let expense = client.add_group_expense(&bob, &group.group_id, draft).await.unwrap();
    assert_eq!(expense.split_method, SplitMethod::Equal);
    assert_eq!(expense.paid_for.len(), 2);

    let summary = client.settlement_summary(&bob, &group.group_id).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!((summary[0].from.as_str(), summary[0].to.as_str()), ("bob", "alice"));
    assert_eq!(summary[0].amount, 40.0);

    let payback = GroupExpenseDraft {
        paid_by: bob.user.user_id.clone(),
        amount: 40.0,
        description: "Paying alice back".to_string(),
        split: SplitInput::Payment {
            paid_for: BTreeSet::from([alice.user.user_id.clone()]),
        },
        date: None,
    };
    let payment = client.add_group_expense(&bob, &group.group_id, payback).await.unwrap();
    assert!(client.settlement_summary(&alice, &group.group_id).await.unwrap().is_empty());

    let bigger = GroupExpenseDraft {
        paid_by: bob.user.user_id.clone(),
        amount: 50.0,
        description: "Paying alice back".to_string(),
        split: SplitInput::Payment {
            paid_for: BTreeSet::from([alice.user.user_id.clone()]),
        },
        date: None,
    };
    client
        .edit_group_expense(&bob, &group.group_id, &payment.group_expense_id, bigger)
        .await
        .unwrap();
    let summary = client.settlement_summary(&alice, &group.group_id).await.unwrap();
    assert_eq!((summary[0].from.as_str(), summary[0].amount), ("alice", 10.0));

    client
        .delete_group_expense(&alice, &group.group_id, &payment.group_expense_id)
        .await
        .unwrap();
    assert_eq!(client.list_group_expenses(&alice, &group.group_id).await.unwrap().len(), 1);

    let members = client.group_members(&bob, &group.group_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(!client.group_audits(&alice, &group.group_id).await.unwrap().is_empty());
    assert_eq!(client.list_groups(&bob).await.unwrap().len(), 1);

    let not_admin = client.delete_group(&bob, &group.group_id).await;
    assert!(matches!(not_admin, Err(ClientError::Forbidden)));
    client.delete_group(&alice, &group.group_id).await.unwrap();
    assert!(client.list_groups(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_split_fails_before_sending() {
    let client = spawn_app().await;
    let alice = signup(&client, "alice").await;
    let group = client.create_group(&alice, "Solo").await.unwrap();

    let draft = GroupExpenseDraft {
        paid_by: alice.user.user_id.clone(),
        amount: 10.0,
        description: "Typo".to_string(),
        split: SplitInput::Percentage {
            shares: ShareMap::from([(alice.user.user_id.clone(), 90.0)]),
        },
        date: None,
    };
    let err = client
        .add_group_expense(&alice, &group.group_id, draft)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Split(SplitError::Validation(_))));
    assert!(!err.is_transient());
    assert!(client.list_group_expenses(&alice, &group.group_id).await.unwrap().is_empty());

    let bad_key = client.join_group(&alice, "bm90LWEta2V5").await;
    assert!(matches!(bad_key, Err(ClientError::NotFound)));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.login("alice", "alice-password").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_transient());
    assert!(ClientError::Server("boom".to_string()).is_transient());
    assert!(!ClientError::Conflict("taken".to_string()).is_transient());
}

#[test]
fn test_client_from_config_targets_api_base_url() {
    let client = ApiClient::from_config().unwrap();
    assert_eq!(
        client.base_url().as_str().trim_end_matches('/'),
        CONFIG.api_base_url.trim().trim_end_matches('/')
    );

    let nested = ApiClient::new("http://127.0.0.1:3000/expenses").unwrap();
    assert_eq!(nested.base_url().as_str(), "http://127.0.0.1:3000/expenses/");
}
