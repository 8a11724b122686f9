// Audit actions
pub const USER_REGISTERED: &str = "USER_REGISTERED";
pub const USER_LOGGED_IN: &str = "USER_LOGGED_IN";
pub const BUDGET_UPDATED: &str = "BUDGET_UPDATED";
pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_EDITED: &str = "EXPENSE_EDITED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const GROUP_CREATED: &str = "GROUP_CREATED";
pub const GROUP_DELETED: &str = "GROUP_DELETED";
pub const MEMBER_INVITED: &str = "MEMBER_INVITED";
pub const MEMBER_JOINED: &str = "MEMBER_JOINED";
pub const GROUP_EXPENSE_ADDED: &str = "GROUP_EXPENSE_ADDED";
pub const GROUP_EXPENSE_EDITED: &str = "GROUP_EXPENSE_EDITED";
pub const GROUP_EXPENSE_DELETED: &str = "GROUP_EXPENSE_DELETED";
pub const SETTLEMENTS_QUERIED: &str = "SETTLEMENTS_QUERIED";

/// Currency tolerance: one cent.
pub const SPLIT_TOLERANCE: f64 = 0.01;

/// Tolerance on percentage-point sums entered directly by users.
pub const PERCENT_TOLERANCE: f64 = 1e-6;

pub const FULL_SHARE: f64 = 100.0;

pub const MAX_AMOUNT: f64 = 1_000_000.0;

pub const PASSPHRASE_LENGTH: usize = 16;

pub const SETTLEMENT_CACHE_TTL_SECS: u64 = 3600;
