//! Shared harness: an in-process router over a throwaway SQLite file.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use taskdeck_server::{AppConfig, AppState, Db, build_router, storage};

pub struct TestApp {
    router: Router,
    pub db: Db,
    _dir: TempDir,
}

/// A registered user and their access token.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = storage::init_db(dir.path()).unwrap();
        let config = AppConfig {
            base_url: "http://localhost:3000".to_string(),
            jwt_secret: "test-secret".to_string(),
            password_iterations: 1_000,
            invitation_ttl_days: 7,
            body_limit_bytes: 8 * 1024 * 1024,
        };
        let router = build_router(AppState {
            db: db.clone(),
            config,
        });
        Self {
            router,
            db,
            _dir: dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None)
            .await
    }

    pub async fn register(&self, name: &str, email: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "correct-horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        TestUser {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: body["data"]["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a workspace owned by `admin`; returns (workspace_id, invite_code).
    pub async fn workspace(&self, admin: &TestUser, name: &str) -> (String, String) {
        let (status, body) = self
            .post("/api/workspaces", admin, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["id"].as_str().unwrap().to_string(),
            body["data"]["invite_code"].as_str().unwrap().to_string(),
        )
    }

    pub async fn join(&self, user: &TestUser, workspace_id: &str, code: &str) {
        let (status, body) = self
            .post(
                &format!("/api/workspaces/{workspace_id}/join"),
                user,
                json!({ "invite_code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    pub async fn project(&self, admin: &TestUser, workspace_id: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/projects",
                admin,
                json!({ "workspace_id": workspace_id, "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn task(&self, user: &TestUser, workspace_id: &str, project_id: &str, body: Value) -> Value {
        let mut payload = json!({ "workspace_id": workspace_id, "project_id": project_id });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), body.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }
        let (status, body) = self.post("/api/tasks", user, payload).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    /// Run raw SQL against the app database (for backdating rows).
    pub fn exec(&self, sql: &str) {
        self.db.conn().execute_batch(sql).unwrap();
    }
}
