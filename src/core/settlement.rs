use std::collections::BTreeMap;

use log::debug;

use crate::constants::constants::{FULL_SHARE, SPLIT_TOLERANCE};
use crate::core::models::settlement::Settlement;
use crate::core::split::{SplitDetail, round_cents};

/// Net position of every member across the given expenses.
///
/// Positive means the member is owed money, negative means they owe.
pub fn net_balances<'a, I>(expenses: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a SplitDetail>,
{
    let mut balances: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        *balances.entry(expense.payer.clone()).or_insert(0.0) += expense.amount;
        for (member, pct) in &expense.shares {
            *balances.entry(member.clone()).or_insert(0.0) -= pct / FULL_SHARE * expense.amount;
        }
    }
    balances
}

/// Greedily pairs the largest debtor with the largest creditor until every
/// balance is within a cent of zero.
pub fn settle_balances(balances: &BTreeMap<String, f64>) -> Vec<Settlement> {
    let mut creditors: Vec<(String, f64)> = balances
        .iter()
        .filter(|(_, bal)| **bal > SPLIT_TOLERANCE)
        .map(|(id, bal)| (id.clone(), *bal))
        .collect();
    let mut debtors: Vec<(String, f64)> = balances
        .iter()
        .filter(|(_, bal)| **bal < -SPLIT_TOLERANCE)
        .map(|(id, bal)| (id.clone(), -*bal))
        .collect();

    // Stable sorts keep id order among equal balances.
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1));
    debtors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut settlements = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < debtors.len() && j < creditors.len() {
        let settled = debtors[i].1.min(creditors[j].1);
        if settled > SPLIT_TOLERANCE {
            settlements.push(Settlement {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount: round_cents(settled),
            });
        }

        debtors[i].1 -= settled;
        creditors[j].1 -= settled;

        if debtors[i].1 < SPLIT_TOLERANCE {
            i += 1;
        }
        if creditors[j].1 < SPLIT_TOLERANCE {
            j += 1;
        }
    }

    debug!("Settled {} balances into {} payments", balances.len(), settlements.len());
    settlements
}

pub fn settle_expenses(expenses: &[SplitDetail]) -> Vec<Settlement> {
    settle_balances(&net_balances(expenses))
}
