use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LedgerEntry, PointUser};

// -- JWT Claims --

/// Session claims carried by every admin token. A valid, unexpired token is
/// the only thing that separates a logged-in admin from an anonymous caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username.
    pub sub: String,
    /// Session id, logged alongside every mutation.
    pub sid: Uuid,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub username: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub discord_name: String,
}

// -- Point changes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyActionRequest {
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustPointsRequest {
    pub amount: i64,
    pub direction: Direction,
}

/// Returned by every balance change: the user as committed, plus the ledger
/// row written in the same transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointChangeResponse {
    pub user: PointUser,
    pub entry: LedgerEntry,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
