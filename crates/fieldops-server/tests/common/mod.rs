//! Shared harness for HTTP tests: an in-memory store behind the real
//! router, driven with `oneshot`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use fieldops_db::DbManager;
use fieldops_server::config::ServerConfig;
use fieldops_server::state::{AppState, State};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const SUPER_CODE: &str = "ROOT01";
pub const SUPER_PHONE: &str = "9000000001";
pub const SUPER_PASSWORD: &str = "rootpass";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn spawn() -> TestApp {
    let storage = std::env::temp_dir().join(format!("fieldops-api-{}", uuid::Uuid::new_v4()));
    let env: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET", "integration-test-secret-32-bytes!!".to_string()),
        ("SUPER_ADMIN_CODE", SUPER_CODE.to_string()),
        ("SUPER_ADMIN_PHONE", SUPER_PHONE.to_string()),
        ("SUPER_ADMIN_PASSWORD", SUPER_PASSWORD.to_string()),
        ("STORAGE_DIR", storage.display().to_string()),
        ("STORAGE_PUBLIC_URL", "http://files.test".to_string()),
    ]);
    let config = ServerConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

    let db = DbManager::connect(&config.db).await.unwrap();
    let state = Arc::new(State::new(db.client().clone(), config));
    TestApp {
        router: fieldops_server::construct_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.raw(request).await
    }

    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.bytes(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn bytes(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    pub async fn login(&self, code: &str, phone: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"tenantCode": code, "phone": phone, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn super_token(&self) -> String {
        self.login(SUPER_CODE, SUPER_PHONE, SUPER_PASSWORD).await
    }

    /// Register and approve a tenant with the given agent phones. Returns
    /// the tenant id. Every password is `pass1234`.
    pub async fn onboard(&self, code: &str, admin_phone: &str, agent_phones: &[&str]) -> String {
        let agents: Vec<Value> = agent_phones
            .iter()
            .enumerate()
            .map(|(i, phone)| json!({"name": format!("Agent {i}"), "phone": phone, "password": "pass1234"}))
            .collect();
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register-distributor",
                None,
                Some(json!({
                    "tenantCode": code,
                    "agencyName": format!("{code} Gas"),
                    "adminName": "Owner",
                    "adminPhone": admin_phone,
                    "adminPassword": "pass1234",
                    "agents": agents,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let request_id = body["data"]["requestId"].as_str().unwrap().to_string();

        let root = self.super_token().await;
        let (status, body) = self
            .send(
                "POST",
                &format!("/api/super-admin/approve-distributor/{request_id}"),
                Some(&root),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["tenant"]["id"].as_str().unwrap().to_string()
    }
}

/// A valid inspection submission.
pub fn inspection_body(answers: &[&str]) -> Value {
    let questions: Vec<Value> = answers
        .iter()
        .enumerate()
        .map(|(i, a)| json!({"questionId": i, "question": format!("Check {i}"), "answer": a}))
        .collect();
    json!({
        "consumer": {
            "name": "Asha",
            "consumerNumber": "C-100",
            "mobileNumber": "9812345678",
            "address": "12 Market Road",
        },
        "safetyQuestions": questions,
        "products": [{"name": "Gas Hose", "price": 250.0, "quantity": 2}],
    })
}
