use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::state::AppState;
use crate::{actions, auth, ledger, users};

/// Build the full HTTP surface. Everything except `/health` and
/// `/auth/login` sits behind the session middleware.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/auth/session", get(auth::session))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/ledger", get(users::user_ledger))
        .route("/users/{user_id}/actions", post(ledger::apply_action))
        .route("/users/{user_id}/points", post(ledger::adjust_points))
        .route("/actions", get(actions::list_actions))
        .route("/ledger", get(ledger::list_ledger))
        .route("/ledger/reconcile", get(ledger::reconcile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
