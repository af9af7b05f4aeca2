//! Shared helpers for router-level tests: an in-memory app and a tiny client.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use myway_api::{AppState, config::ApiConfig};
use myway_core::repo::memory::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: "postgres://unused".into(),
            jwt_secret: "test-secret".into(),
            access_token_ttl_secs: 900,
        },
    );
    TestApp {
        router: myway_api::router(state),
        store,
    }
}

/// A signed-up user.
pub struct User {
    pub id: String,
    pub access: String,
    pub refresh: String,
}

impl TestApp {
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        org: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if let Some(org) = org {
            builder = builder.header("x-org-id", org);
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), None, Some(body)).await
    }

    pub async fn signup(&self, email: &str) -> User {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/signup",
                None,
                None,
                Some(json!({"email": email, "password": "secret123", "name": email})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        User {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            access: body["accessToken"].as_str().unwrap().to_string(),
            refresh: body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    /// Create an organization owned by `owner`; returns its id.
    pub async fn create_org(&self, owner: &User, name: &str) -> String {
        let (status, body) = self
            .post("/organizations", &owner.access, json!({"name": name}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create org failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn create_course(&self, owner: &User, org: &str, code: &str) -> String {
        let (status, body) = self
            .post(
                "/courses",
                &owner.access,
                json!({"orgId": org, "code": code, "title": format!("{code} title")}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create course failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn invite(&self, organizer: &User, org: &str, email: &str, role: &str) {
        let (status, body) = self
            .post(
                &format!("/organizations/{org}/invite"),
                &organizer.access,
                json!({"email": email, "role": role}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {body}");
    }

    pub async fn create_assignment(&self, teacher: &User, course: &str, points: i32) -> String {
        let (status, body) = self
            .post(
                &format!("/courses/{course}/assignments"),
                &teacher.access,
                json!({
                    "title": "Homework",
                    "dueAt": "2030-01-01T00:00:00Z",
                    "points": points,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create assignment failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}
