//! Split calculation for shared group expenses.
//!
//! Every split is expressed as a [`SplitDetail`]: the payer, the total amount and a
//! map from participant id to a share in percentage points. Currency amounts are
//! derived from the percentages on demand with [`SplitDetail::amounts`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::constants::{FULL_SHARE, PERCENT_TOLERANCE, SPLIT_TOLERANCE};
use crate::core::errors::SplitError;

/// Participant id -> share. Percentage points in a [`SplitDetail`], currency amounts
/// when passed to [`custom_split`].
pub type ShareMap = BTreeMap<String, f64>;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    Equal,
    Percentage,
    Custom,
    Payment,
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SplitMethod::Equal => "equal",
            SplitMethod::Percentage => "percentage",
            SplitMethod::Custom => "custom",
            SplitMethod::Payment => "payment",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SplitMethod {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(SplitMethod::Equal),
            "percentage" => Ok(SplitMethod::Percentage),
            "custom" => Ok(SplitMethod::Custom),
            "payment" => Ok(SplitMethod::Payment),
            other => Err(SplitError::InvalidInput(format!("unknown split method `{}`", other))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SplitDetail {
    pub payer: String,
    pub amount: f64,
    pub shares: BTreeMap<String, f64>,
}

/// Caller-supplied inputs for each split method.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitInput {
    /// Everyone listed gets the same share.
    Equal { participants: Vec<String> },
    /// Percentages per participant, expected to sum to 100.
    Percentage { shares: ShareMap },
    /// Currency amounts per participant, expected to sum to the total.
    Custom { amounts: ShareMap },
    /// The participants marked "paid for"; exactly one is allowed.
    Payment { paid_for: BTreeSet<String> },
}

impl SplitInput {
    pub fn method(&self) -> SplitMethod {
        match self {
            SplitInput::Equal { .. } => SplitMethod::Equal,
            SplitInput::Percentage { .. } => SplitMethod::Percentage,
            SplitInput::Custom { .. } => SplitMethod::Custom,
            SplitInput::Payment { .. } => SplitMethod::Payment,
        }
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Produces the split detail for `amount` paid by `payer`.
pub fn calculate(amount: f64, payer: &str, input: &SplitInput) -> Result<SplitDetail, SplitError> {
    debug!("Calculating {} split of {} paid by {}", input.method(), amount, payer);
    match input {
        SplitInput::Equal { participants } => equal_split(amount, payer, participants),
        SplitInput::Percentage { shares } => percentage_split(amount, payer, shares),
        SplitInput::Custom { amounts } => custom_split(amount, payer, amounts),
        SplitInput::Payment { paid_for } => payment_split(amount, payer, paid_for),
    }
}

pub fn equal_split(amount: f64, payer: &str, participants: &[String]) -> Result<SplitDetail, SplitError> {
    check_total(amount)?;
    let unique: BTreeSet<&String> = participants.iter().collect();
    if unique.is_empty() {
        warn!("Equal split of {} requested with no participants", amount);
        return Err(SplitError::InvalidInput(
            "equal split needs at least one participant".to_string(),
        ));
    }

    let share = FULL_SHARE / unique.len() as f64;
    let shares = unique.into_iter().map(|id| (id.clone(), share)).collect();
    Ok(SplitDetail {
        payer: payer.to_string(),
        amount,
        shares,
    })
}

pub fn percentage_split(amount: f64, payer: &str, shares: &ShareMap) -> Result<SplitDetail, SplitError> {
    check_total(amount)?;
    check_entries("percentage", shares)?;

    let total: f64 = shares.values().sum();
    if (total - FULL_SHARE).abs() > PERCENT_TOLERANCE {
        warn!("Percentage split rejected: shares sum to {}", total);
        return Err(SplitError::Validation(format!(
            "percentage shares must sum to 100, got {}",
            total
        )));
    }

    Ok(SplitDetail {
        payer: payer.to_string(),
        amount,
        shares: shares.clone(),
    })
}

pub fn custom_split(amount: f64, payer: &str, amounts: &ShareMap) -> Result<SplitDetail, SplitError> {
    check_total(amount)?;
    check_entries("custom", amounts)?;

    let shares: ShareMap = amounts
        .iter()
        .map(|(id, part)| (id.clone(), part / amount * FULL_SHARE))
        .collect();

    let reconstructed: f64 = shares.values().map(|pct| pct / FULL_SHARE * amount).sum();
    if (reconstructed - amount).abs() > SPLIT_TOLERANCE {
        warn!(
            "Custom split rejected: amounts reconstruct {} against a total of {}",
            reconstructed, amount
        );
        return Err(SplitError::Validation(format!(
            "individual amounts sum to {:.2}, expected {:.2}",
            reconstructed, amount
        )));
    }

    Ok(SplitDetail {
        payer: payer.to_string(),
        amount,
        shares,
    })
}

pub fn payment_split(amount: f64, payer: &str, paid_for: &BTreeSet<String>) -> Result<SplitDetail, SplitError> {
    check_total(amount)?;
    let mut marked = paid_for.iter();
    let recipient = match (marked.next(), marked.next()) {
        (Some(recipient), None) => recipient,
        (None, _) => {
            return Err(SplitError::Validation(
                "select the member this payment was made for".to_string(),
            ));
        }
        (Some(_), Some(_)) => {
            warn!("Payment split rejected: {} members marked", paid_for.len());
            return Err(SplitError::Validation(format!(
                "a payment is made for exactly one member, {} were selected",
                paid_for.len()
            )));
        }
    };

    Ok(SplitDetail {
        payer: payer.to_string(),
        amount,
        shares: ShareMap::from([(recipient.clone(), FULL_SHARE)]),
    })
}

impl SplitDetail {
    pub fn total_share(&self) -> f64 {
        self.shares.values().sum()
    }

    /// Currency amount owed by each participant.
    pub fn amounts(&self) -> ShareMap {
        self.shares
            .iter()
            .map(|(id, pct)| (id.clone(), pct / FULL_SHARE * self.amount))
            .collect()
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.shares.keys().map(String::as_str)
    }

    /// Re-checks the invariants of `method` against a detail that was built elsewhere.
    pub fn verify(&self, method: SplitMethod) -> Result<(), SplitError> {
        check_total(self.amount)?;
        check_entries("share", &self.shares)?;
        if self.shares.is_empty() {
            return Err(SplitError::InvalidInput("split has no participants".to_string()));
        }

        match method {
            SplitMethod::Equal => {
                let expected = FULL_SHARE / self.shares.len() as f64;
                if let Some((id, pct)) = self
                    .shares
                    .iter()
                    .find(|(_, pct)| (**pct - expected).abs() > PERCENT_TOLERANCE)
                {
                    return Err(SplitError::Validation(format!(
                        "equal split gives {} a share of {}, expected {}",
                        id, pct, expected
                    )));
                }
                Ok(())
            }
            SplitMethod::Percentage => {
                let total = self.total_share();
                if (total - FULL_SHARE).abs() > PERCENT_TOLERANCE {
                    return Err(SplitError::Validation(format!(
                        "percentage shares must sum to 100, got {}",
                        total
                    )));
                }
                Ok(())
            }
            SplitMethod::Custom => {
                let reconstructed: f64 = self.amounts().values().sum();
                if (reconstructed - self.amount).abs() > SPLIT_TOLERANCE {
                    return Err(SplitError::Validation(format!(
                        "individual amounts sum to {:.2}, expected {:.2}",
                        reconstructed, self.amount
                    )));
                }
                Ok(())
            }
            SplitMethod::Payment => match self.shares.values().next() {
                Some(pct) if self.shares.len() == 1 && (pct - FULL_SHARE).abs() <= PERCENT_TOLERANCE => Ok(()),
                _ => Err(SplitError::Validation(
                    "a payment assigns a 100 share to exactly one member".to_string(),
                )),
            },
        }
    }
}

fn check_total(amount: f64) -> Result<(), SplitError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SplitError::InvalidInput(format!(
            "total amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(())
}

fn check_entries(kind: &str, entries: &ShareMap) -> Result<(), SplitError> {
    if let Some((id, value)) = entries.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
        return Err(SplitError::InvalidInput(format!(
            "{} for {} must be a non-negative number, got {}",
            kind, id, value
        )));
    }
    Ok(())
}
