use crate::core::models::settlement::Settlement;
use crate::core::settlement::{net_balances, settle_balances, settle_expenses};
use crate::core::split::{SplitDetail, custom_split, equal_split, payment_split, percentage_split};
use std::collections::{BTreeMap, BTreeSet};

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn paid_for(name: &str) -> BTreeSet<String> {
    BTreeSet::from([name.to_string()])
}

fn mixed_expenses() -> Vec<SplitDetail> {
    vec![
        equal_split(90.0, "alice", &ids(&["alice", "bob", "carol"])).unwrap(),
        percentage_split(
            40.0,
            "bob",
            &BTreeMap::from([("alice".to_string(), 25.0), ("dave".to_string(), 75.0)]),
        )
        .unwrap(),
        custom_split(
            33.0,
            "carol",
            &BTreeMap::from([("bob".to_string(), 13.0), ("carol".to_string(), 20.0)]),
        )
        .unwrap(),
        payment_split(12.5, "dave", &paid_for("alice")).unwrap(),
    ]
}

#[test]
fn test_single_expense_settles_each_non_payer_share() {
    let _ = env_logger::try_init();
    let expense = equal_split(90.0, "alice", &ids(&["alice", "bob", "carol"])).unwrap();
    let settlements = settle_expenses(&[expense]);

    assert_eq!(
        settlements,
        vec![
            Settlement {
                from: "bob".to_string(),
                to: "alice".to_string(),
                amount: 30.0,
            },
            Settlement {
                from: "carol".to_string(),
                to: "alice".to_string(),
                amount: 30.0,
            },
        ]
    );
}

#[test]
fn test_net_balances_sum_to_zero() {
    let _ = env_logger::try_init();
    let balances = net_balances(&mixed_expenses());
    let total: f64 = balances.values().sum();
    assert!(total.abs() < 1e-9);
    assert!((balances["alice"] - (90.0 - 30.0 - 10.0 - 12.5)).abs() < 1e-9);
}

#[test]
fn test_settlements_conserve_net_balances() {
    let _ = env_logger::try_init();
    let expenses = mixed_expenses();
    let balances = net_balances(&expenses);
    let settlements = settle_balances(&balances);

    let mut settled: BTreeMap<String, f64> = BTreeMap::new();
    for s in &settlements {
        assert!(s.amount > 0.0);
        assert_ne!(s.from, s.to);
        *settled.entry(s.to.clone()).or_insert(0.0) += s.amount;
        *settled.entry(s.from.clone()).or_insert(0.0) -= s.amount;
    }
    for (member, balance) in &balances {
        let got = settled.get(member).copied().unwrap_or(0.0);
        assert!((got - balance).abs() <= 0.01 + 1e-9, "{}: {} vs {}", member, got, balance);
    }
}

#[test]
fn test_settled_group_yields_no_payments() {
    let _ = env_logger::try_init();
    let expenses = vec![
        payment_split(50.0, "alice", &paid_for("bob")).unwrap(),
        payment_split(50.0, "bob", &paid_for("alice")).unwrap(),
    ];
    assert!(settle_expenses(&expenses).is_empty());
    assert!(settle_expenses(&[]).is_empty());
}

#[test]
fn test_largest_debt_is_matched_first() {
    let _ = env_logger::try_init();
    let balances = BTreeMap::from([
        ("alice".to_string(), 70.0),
        ("bob".to_string(), -20.0),
        ("carol".to_string(), -50.0),
    ]);
    let settlements = settle_balances(&balances);
    assert_eq!(settlements.len(), 2);
    assert_eq!(settlements[0].from, "carol");
    assert_eq!(settlements[0].amount, 50.0);
    assert_eq!(settlements[1].from, "bob");
    assert_eq!(settlements[1].amount, 20.0);
}

#[test]
fn test_remainders_carry_over_between_creditors() {
    let _ = env_logger::try_init();
    let balances = BTreeMap::from([
        ("alice".to_string(), 30.0),
        ("bob".to_string(), 20.0),
        ("carol".to_string(), -50.0),
    ]);
    let settlements = settle_balances(&balances);
    assert_eq!(
        settlements,
        vec![
            Settlement {
                from: "carol".to_string(),
                to: "alice".to_string(),
                amount: 30.0,
            },
            Settlement {
                from: "carol".to_string(),
                to: "bob".to_string(),
                amount: 20.0,
            },
        ]
    );
}

#[test]
fn test_amounts_are_rounded_to_cents() {
    let _ = env_logger::try_init();
    let expense = equal_split(100.0, "alice", &ids(&["alice", "bob", "carol"])).unwrap();
    for s in settle_expenses(&[expense]) {
        assert_eq!(s.amount, 33.33);
    }
}
