use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;

use points_types::api::{
    AdjustPointsRequest, ApplyActionRequest, Claims, Direction, PointChangeResponse,
};
use points_types::models::{BalanceDrift, LedgerEntry};

use crate::actions::find_action;
use crate::convert::{balance_drift, ledger_entry, point_user};
use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Largest manual adjustment accepted in one request.
pub const MAX_ADJUSTMENT: i64 = 1_000_000;

pub async fn apply_action(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ApplyActionRequest>,
) -> Result<Json<PointChangeResponse>, ApiError> {
    let action = find_action(&req.action)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown action: {}", req.action)))?;

    let change = change_points(&state, user_id, action.amount, action.padded).await?;
    info!(
        "{} applied '{}' ({:+}) to {} (session {})",
        claims.sub, action.label, action.amount, change.user.user_id, claims.sid
    );

    Ok(Json(change))
}

pub async fn adjust_points(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdjustPointsRequest>,
) -> Result<Json<PointChangeResponse>, ApiError> {
    if req.amount < 1 {
        return Err(ApiError::BadRequest("Amount must be at least 1".into()));
    }
    if req.amount > MAX_ADJUSTMENT {
        return Err(ApiError::BadRequest(format!(
            "Amount must be at most {}",
            MAX_ADJUSTMENT
        )));
    }
    let (amount, padded) = match req.direction {
        Direction::Add => (req.amount, true),
        Direction::Remove => (-req.amount, false),
    };

    let change = change_points(&state, user_id, amount, padded).await?;
    info!(
        "{} adjusted {} by {:+} (session {})",
        claims.sub, change.user.user_id, amount, claims.sid
    );

    Ok(Json(change))
}

pub async fn list_ledger(
    State(state): State<AppState>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let rows = run_db(&state, |db| db.ledger()).await?;
    Ok(Json(rows.into_iter().map(ledger_entry).collect()))
}

pub async fn reconcile(State(state): State<AppState>) -> Result<Json<Vec<BalanceDrift>>, ApiError> {
    let rows = run_db(&state, |db| db.reconcile()).await?;
    Ok(Json(rows.into_iter().map(balance_drift).collect()))
}

/// Balance update and ledger insert, committed together.
async fn change_points(
    state: &AppState,
    user_id: String,
    amount: i64,
    padded: bool,
) -> Result<PointChangeResponse, ApiError> {
    let uid = user_id.clone();
    let (user, entry) = run_db(state, move |db| db.apply_points(&uid, amount, padded))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))?;

    Ok(PointChangeResponse {
        user: point_user(user),
        entry: ledger_entry(entry),
    })
}
