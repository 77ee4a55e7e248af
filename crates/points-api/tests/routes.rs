use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use points_api::auth::create_token;
use points_api::ledger::MAX_ADJUSTMENT;
use points_api::password::{hash_password, legacy_hash};
use points_api::{AppStateInner, router};
use points_db::Database;

const SECRET: &str = "integration-test-secret";

struct Harness {
    _dir: TempDir,
    app: Router,
}

impl Harness {
    /// Fresh database with one admin ("admin", "secret") stored the legacy way.
    fn new() -> Self {
        Self::with_db(|_| {})
    }

    /// Like `new`, with `setup` run against the database before serving.
    fn with_db(setup: impl FnOnce(&Database)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("points.db")).unwrap();
        db.create_admin("admin", &legacy_hash("secret")).unwrap();
        setup(&db);

        let state = Arc::new(AppStateInner {
            db,
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::hours(1),
        });
        Self {
            _dir: dir,
            app: router(state),
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.send(post_json(
            "/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ))
        .await
    }

    async fn token(&self) -> String {
        let (status, body) = self.login("admin", "secret").await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(post_json(uri, Some(token), body)).await
    }
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let h = Harness::new();
    let (status, body) = h
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let h = Harness::new();

    let (status, body) = h
        .send(Request::get("/users").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = h.get("/users", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = create_token("some-other-secret", "admin", chrono::Duration::hours(1)).unwrap();
    let (status, _) = h.get("/users", &forged.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = create_token(SECRET, "admin", chrono::Duration::hours(-2)).unwrap();
    let (status, _) = h.get("/users", &expired.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send(post_json("/users", None, json!({ "username": "mallory" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let h = Harness::new();

    let (status, body) = h.login("admin", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = h.login("nobody", "secret").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_echoes_the_logged_in_admin() {
    let h = Harness::new();
    let token = h.token().await;

    let (status, body) = h.get("/auth/session", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert!(body["session_id"].is_string());
}

#[tokio::test]
async fn argon2_admins_can_log_in() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("points.db")).unwrap();
    db.create_admin("root", &hash_password("correct horse").unwrap())
        .unwrap();
    let app = router(Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.into(),
        token_ttl: chrono::Duration::hours(1),
    }));
    let h = Harness { _dir: dir, app };

    let (status, body) = h.login("root", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "root");

    let (status, _) = h.login("root", "correct horse battery").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_list_users() {
    let h = Harness::new();
    let token = h.token().await;

    let (status, body) = h
        .post(
            "/users",
            &token,
            json!({ "username": "  alice ", "discord_name": "alice#0001" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["points"], 0);

    let (status, body) = h.post("/users", &token, json!({ "username": "bob" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], "u2");
    assert_eq!(body["discord_name"], "");

    let (status, body) = h.get("/users", &token).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["user_id"], "u1");
    assert_eq!(users[0]["points"], 0);

    let (status, body) = h.get("/users/u2", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");

    let (status, _) = h.get("/users/u42", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn username_is_required() {
    let h = Harness::new();
    let token = h.token().await;

    let (status, body) = h
        .post("/users", &token, json!({ "username": "   ", "discord_name": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username required");

    let (_, body) = h.get("/users", &token).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_user_skips_ids_taken_outside_the_service() {
    let h = Harness::with_db(|db| {
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO pointuser (userid, username) VALUES ('u1', 'imported')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    });
    let token = h.token().await;

    for expected in ["u2", "u3"] {
        let (status, body) = h.post("/users", &token, json!({ "username": "alice" })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_id"], expected);
    }

    let (_, body) = h.get("/users", &token).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["user_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn joined_discord_on_u3_with_five_points() {
    let h = Harness::new();
    let token = h.token().await;

    for name in ["alice", "bob", "carol"] {
        let (status, _) = h.post("/users", &token, json!({ "username": name })).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = h
        .post(
            "/users/u3/points",
            &token,
            json!({ "amount": 5, "direction": "add" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["points"], 5);

    let (status, body) = h
        .post(
            "/users/u3/actions",
            &token,
            json!({ "action": "Joined Discord" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user_id"], "u3");
    assert_eq!(body["user"]["points"], 25);
    assert_eq!(body["entry"]["user_id"], "u3");
    assert_eq!(body["entry"]["amount"], 20);
    assert_eq!(body["entry"]["padded"], true);

    let (_, body) = h.get("/users/u3/ledger", &token).await;
    let amounts: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount"].as_i64().unwrap())
        .collect();
    assert_eq!(amounts, vec![5, 20]);
}

#[tokio::test]
async fn deltas_accumulate_and_reconcile() {
    let h = Harness::new();
    let token = h.token().await;
    h.post("/users", &token, json!({ "username": "alice" })).await;

    h.post(
        "/users/u1/actions",
        &token,
        json!({ "action": "Referred Friend (Got SGT)" }),
    )
    .await;
    h.post(
        "/users/u1/actions",
        &token,
        json!({ "action": "Referred Friend (Joined Server)" }),
    )
    .await;
    let (status, body) = h
        .post(
            "/users/u1/points",
            &token,
            json!({ "amount": 30, "direction": "remove" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["points"], 120);
    assert_eq!(body["entry"]["amount"], -30);
    assert_eq!(body["entry"]["padded"], false);

    let (_, body) = h.get("/ledger", &token).await;
    let pids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["pid"].as_str().unwrap())
        .collect();
    assert_eq!(pids, vec!["p1", "p2", "p3"]);

    let (status, body) = h.get("/ledger/reconcile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_point_changes_write_nothing() {
    let h = Harness::new();
    let token = h.token().await;
    h.post("/users", &token, json!({ "username": "alice" })).await;

    let (status, body) = h
        .post("/users/u1/actions", &token, json!({ "action": "Won the lottery" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown action: Won the lottery");

    let (status, _) = h
        .post("/users/u9/actions", &token, json!({ "action": "Joined Discord" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .post(
            "/users/u1/points",
            &token,
            json!({ "amount": 0, "direction": "add" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .post(
            "/users/u1/points",
            &token,
            json!({ "amount": -5, "direction": "remove" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for amount in [MAX_ADJUSTMENT + 1, i64::MAX] {
        let (status, body) = h
            .post(
                "/users/u1/points",
                &token,
                json!({ "amount": amount, "direction": "add" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    let (_, body) = h.get("/ledger", &token).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = h.get("/users/u1", &token).await;
    assert_eq!(body["points"], 0);

    let (status, _) = h.get("/users/u9/ledger", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_table_is_listed() {
    let h = Harness::new();
    let token = h.token().await;

    let (status, body) = h.get("/actions", &token).await;
    assert_eq!(status, StatusCode::OK);
    let actions = body.as_array().unwrap();
    assert_eq!(actions.len(), 5);
    assert_eq!(actions[0]["label"], "Joined Discord");
    assert_eq!(actions[0]["amount"], 20);
    assert_eq!(actions[3]["amount"], -250);
}
