use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `from` owes `amount` to `to`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: f64,
}
