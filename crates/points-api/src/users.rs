use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use points_types::api::{Claims, CreateUserRequest};
use points_types::models::{LedgerEntry, PointUser};

use crate::convert::{ledger_entry, point_user};
use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PointUser>>, ApiError> {
    let rows = run_db(&state, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(point_user).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username required".into()));
    }
    let discord_name = req.discord_name.trim().to_string();

    let row = run_db(&state, move |db| db.create_user(&username, &discord_name)).await?;
    info!(
        "{} created user {} '{}' (session {})",
        claims.sub, row.userid, row.username, claims.sid
    );

    Ok((StatusCode::CREATED, Json(point_user(row))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PointUser>, ApiError> {
    let uid = user_id.clone();
    let row = run_db(&state, move |db| db.get_user(&uid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))?;
    Ok(Json(point_user(row)))
}

pub async fn user_ledger(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let uid = user_id.clone();
    let rows = run_db(&state, move |db| {
        Ok(match db.get_user(&uid)? {
            Some(_) => Some(db.ledger_for_user(&uid)?),
            None => None,
        })
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))?;

    Ok(Json(rows.into_iter().map(ledger_entry).collect()))
}
