use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of the reward program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointUser {
    pub user_id: String,
    pub username: String,
    pub discord_name: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// One immutable row of point history.
///
/// `padded` is true for reward-type grants and false for redemptions
/// and other debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub pid: String,
    pub user_id: String,
    pub amount: i64,
    pub padded: bool,
    pub created_at: DateTime<Utc>,
}

/// A named, pre-configured point change an admin can apply in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointAction {
    pub label: &'static str,
    pub amount: i64,
    pub padded: bool,
}

/// A user whose stored balance disagrees with the sum of their ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub user_id: String,
    pub points: i64,
    pub ledger_total: i64,
}
