use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use points_db::Database;
use points_types::api::{Claims, LoginRequest, LoginResponse, SessionResponse};

use crate::error::ApiError;
use crate::password::verify_password;
use crate::state::{AppState, run_db};

/// A freshly signed session token.
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// True when `username` exists and `password` matches its stored hash.
pub fn verify_admin(db: &Database, username: &str, password: &str) -> anyhow::Result<bool> {
    let Some(admin) = db.get_admin(username)? else {
        return Ok(false);
    };
    Ok(verify_password(&admin.password, password))
}

pub fn create_token(
    secret: &str,
    username: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<IssuedToken> {
    let now = Utc::now();
    let expires_at = now + ttl;
    let claims = Claims {
        sub: username.to_string(),
        sid: Uuid::new_v4(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(IssuedToken {
        token,
        claims,
        expires_at,
    })
}

/// Validate signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let LoginRequest { username, password } = req;

    let name = username.clone();
    let valid = run_db(&state, move |db| verify_admin(db, &name, &password)).await?;
    if !valid {
        warn!("Failed login attempt for '{}'", username);
        return Err(ApiError::InvalidCredentials);
    }

    let issued =
        create_token(&state.jwt_secret, &username, state.token_ttl).map_err(ApiError::Internal)?;
    info!("Admin '{}' logged in (session {})", username, issued.claims.sid);

    Ok(Json(LoginResponse {
        username,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

pub async fn session(Extension(claims): Extension<Claims>) -> Json<SessionResponse> {
    Json(SessionResponse {
        expires_at: session_expiry(&claims),
        username: claims.sub,
        session_id: claims.sid,
    })
}

/// `exp` as a timestamp. A signed `exp` past chrono's range never expires,
/// so it is reported as the latest representable instant.
fn session_expiry(claims: &Claims) -> DateTime<Utc> {
    i64::try_from(claims.exp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(|| {
            warn!("Session {} has out-of-range exp {}", claims.sid, claims.exp);
            DateTime::<Utc>::MAX_UTC
        })
}
