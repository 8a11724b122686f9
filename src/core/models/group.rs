use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Group {
    pub group_id: String,
    pub group_name: String,
    pub admin: String,
    pub members: Vec<String>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub date_created: DateTime<Utc>,
    pub passphrase: String,
}

impl Group {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin == user_id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.is_admin(user_id) || self.members.iter().any(|m| m == user_id)
    }

    /// Admin first, then members in join order, without duplicates.
    pub fn all_members(&self) -> Vec<&str> {
        let mut all = vec![self.admin.as_str()];
        for member in &self.members {
            if !all.contains(&member.as_str()) {
                all.push(member);
            }
        }
        all
    }
}
