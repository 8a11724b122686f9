use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::split::{SplitDetail, SplitMethod};

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GroupExpense {
    pub group_expense_id: String,
    pub group_id: String,
    pub paid_by: String,
    pub amount: f64,
    pub description: String,
    pub paid_for: Vec<String>,
    pub split_method: SplitMethod,
    pub split_details: SplitDetail,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub date: DateTime<Utc>,
}
