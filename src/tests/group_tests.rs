use crate::constants::constants::{GROUP_CREATED, GROUP_DELETED, MEMBER_INVITED, MEMBER_JOINED};
use crate::core::errors::ExpenseError;
use crate::core::services::{decode_join_key, encode_join_key};
use crate::tests::{create_test_service, register};
use base64::{Engine, engine::general_purpose::URL_SAFE};

#[tokio::test]
async fn test_create_group() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;

    let group = service.create_group(&alice, "Trip".to_string()).await.unwrap();
    assert_eq!(group.group_name, "Trip");
    assert_eq!(group.admin, alice);
    assert!(group.members.is_empty());
    assert!(group.is_member(&alice));
    assert_eq!(group.passphrase.len(), 16);
    assert!(group.passphrase.chars().all(|c| c.is_ascii_alphanumeric()));

    let groups = service.list_user_groups(&alice).await.unwrap();
    assert_eq!(groups, vec![group.clone()]);

    let audits = service.get_group_audits(&alice, &group.group_id).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, GROUP_CREATED);

    let empty_name = service.create_group(&alice, " ".to_string()).await;
    assert!(matches!(empty_name, Err(ExpenseError::InvalidInput(..))));
}

#[tokio::test]
async fn test_group_is_visible_to_members_only() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;
    let bob = register(&service, "bob").await.user.user_id;
    let group = service.create_group(&alice, "Flat".to_string()).await.unwrap();

    let result = service.get_group(&bob, &group.group_id).await;
    assert!(matches!(result, Err(ExpenseError::NotGroupMember(_))));
    assert!(service.list_user_groups(&bob).await.unwrap().is_empty());

    let missing = service.get_group(&alice, "no-such-group").await;
    assert!(matches!(missing, Err(ExpenseError::GroupNotFound(_))));
}

#[tokio::test]
async fn test_invite_and_join() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;
    let bob = register(&service, "bob").await.user.user_id;
    let group = service.create_group(&alice, "Flat".to_string()).await.unwrap();

    let api_key = service
        .invite_to_group(&alice, &group.group_id, "bob@example.com")
        .await
        .unwrap();
    assert_eq!(
        decode_join_key(&api_key).unwrap(),
        (group.group_id.clone(), group.passphrase.clone())
    );

    let joined = service.join_group(&bob, &api_key).await.unwrap();
    assert_eq!(joined.members, vec![bob.clone()]);
    assert_eq!(service.list_user_groups(&bob).await.unwrap().len(), 1);

    let twice = service.join_group(&bob, &api_key).await;
    assert!(matches!(twice, Err(ExpenseError::AlreadyGroupMember(_))));

    let reinvite = service
        .invite_to_group(&alice, &group.group_id, "bob@example.com")
        .await;
    assert!(matches!(reinvite, Err(ExpenseError::AlreadyGroupMember(_))));

    let members = service.group_members(&bob, &group.group_id).await.unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let actions: Vec<String> = service
        .get_group_audits(&alice, &group.group_id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert_eq!(actions, vec![GROUP_CREATED, MEMBER_INVITED, MEMBER_JOINED]);
}

#[tokio::test]
async fn test_invite_requires_membership_and_valid_email() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;
    let bob = register(&service, "bob").await.user.user_id;
    let group = service.create_group(&alice, "Flat".to_string()).await.unwrap();

    let outsider = service
        .invite_to_group(&bob, &group.group_id, "carol@example.com")
        .await;
    assert!(matches!(outsider, Err(ExpenseError::NotGroupMember(_))));

    let bad_email = service.invite_to_group(&alice, &group.group_id, "carol").await;
    assert!(matches!(bad_email, Err(ExpenseError::InvalidEmail(_))));

    // Invites to addresses without an account are still issued.
    assert!(
        service
            .invite_to_group(&alice, &group.group_id, "carol@example.com")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_join_with_bad_key() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;
    let bob = register(&service, "bob").await.user.user_id;
    let group = service.create_group(&alice, "Flat".to_string()).await.unwrap();

    let wrong_passphrase = encode_join_key(&group.group_id, "0000000000000000");
    let no_separator = URL_SAFE.encode("just-an-id");
    for key in [wrong_passphrase.as_str(), no_separator.as_str(), "%%% not base64 %%%"] {
        let result = service.join_group(&bob, key).await;
        assert!(matches!(result, Err(ExpenseError::InvalidJoinKey)), "key {}", key);
    }
    assert!(service.get_group(&bob, &group.group_id).await.is_err());
}

#[tokio::test]
async fn test_delete_group_is_admin_only() {
    let service = create_test_service();
    let alice = register(&service, "alice").await.user.user_id;
    let bob = register(&service, "bob").await.user.user_id;
    let group = service.create_group(&alice, "Flat".to_string()).await.unwrap();
    let api_key = service
        .invite_to_group(&alice, &group.group_id, "bob@example.com")
        .await
        .unwrap();
    service.join_group(&bob, &api_key).await.unwrap();

    let by_member = service.delete_group(&bob, &group.group_id).await;
    assert!(matches!(by_member, Err(ExpenseError::NotGroupAdmin(_))));

    service.delete_group(&alice, &group.group_id).await.unwrap();
    let gone = service.get_group(&alice, &group.group_id).await;
    assert!(matches!(gone, Err(ExpenseError::GroupNotFound(_))));
    assert!(service.list_user_groups(&bob).await.unwrap().is_empty());

    let logs = service.get_app_logs_by_action(GROUP_DELETED).await.unwrap();
    assert_eq!(logs.len(), 1);
}
