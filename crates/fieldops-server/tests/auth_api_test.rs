mod common;

use axum::http::StatusCode;
use chrono::Utc;
use fieldops_auth::BearerClaims;
use fieldops_core::models::claims::Role;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

use common::{SUPER_CODE, spawn};

#[tokio::test]
async fn health_is_public_and_enveloped() {
    let app = spawn().await;
    let (status, body) = app.send("GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_routes_answer_with_the_envelope() {
    let app = spawn().await;
    for uri in ["/api/does-not-exist", "/nowhere"] {
        let (status, body) = app.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NotFoundError");
        assert!(body["message"].as_str().unwrap().contains(uri));
    }
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = spawn().await;

    let (status, body) = app.send("GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "AuthError");

    let (status, _) = app
        .send("GET", "/api/products", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_refused() {
    let app = spawn().await;
    let config = app.state.auth.config();
    let now = Utc::now().timestamp();
    let stale = BearerClaims {
        sub: "super_admin".into(),
        role: Role::SuperAdmin,
        tenant_id: None,
        agent_id: None,
        tenant_code: SUPER_CODE.into(),
        iss: config.jwt_issuer.clone(),
        iat: now - 90_000,
        exp: now - 3_600,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &stale,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = app
        .send("GET", "/api/super-admin/dashboard-stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthError");

    // A live token for the same account passes.
    let fresh = app.super_token().await;
    let (status, _) = app
        .send("GET", "/api/super-admin/dashboard-stats", Some(&fresh), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn registration_example_body_is_accepted_then_approved() {
    let app = spawn().await;

    // Unknown until approved.
    let (status, _) = app
        .send(
            "POST",
            "/api/auth/validate-sap",
            None,
            Some(json!({"tenantCode": "AG001"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register-distributor",
            None,
            Some(json!({
                "tenantCode": "AG001",
                "agencyName": "Acme Gas",
                "adminPhone": "9876543210",
                "adminPassword": "pass1234",
                "agents": [{"name": "Ravi", "phone": "9876500000", "password": "abcd"}],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let request_id = body["data"]["requestId"].as_str().unwrap().to_string();

    let root = app.super_token().await;
    let (status, body) = app
        .send("GET", "/api/super-admin/distributor-requests", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert!(body["data"]["items"][0].get("adminPasswordHash").is_none());

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/super-admin/approve-distributor/{request_id}"),
            Some(&root),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["request"]["status"], "approved");
    assert_eq!(body["data"]["tenant"]["code"], "AG001");
    assert_eq!(body["data"]["tenant"]["isActive"], true);
    assert_eq!(body["data"]["tenant"]["adminName"], "Acme Gas");
    assert_eq!(body["data"]["agents"][0]["name"], "Ravi");
    assert_eq!(body["data"]["agents"][0]["isActive"], true);

    // A second decision is refused.
    let (status, _) = app
        .send(
            "POST",
            &format!("/api/super-admin/reject-distributor/{request_id}"),
            Some(&root),
            Some(json!({"reason": "late"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/validate-sap",
            None,
            Some(json!({"tenantCode": "ag001"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "tenant_admin");
    assert_eq!(body["data"]["name"], "Acme Gas");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"tenantCode": "AG001", "phone": "9876543210", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let admin = app.login("AG001", "9876543210", "pass1234").await;
    let (status, body) = app.send("GET", "/api/auth/profile", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "tenant_admin");

    let agent = app.login("AG001", "9876500000", "abcd").await;
    let (status, body) = app.send("GET", "/api/auth/profile", Some(&agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "agent");
    assert_eq!(body["data"]["tenant_name"], "Acme Gas");
}

#[tokio::test]
async fn super_admin_code_is_recognised() {
    let app = spawn().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/auth/validate-sap",
            None,
            Some(json!({"sapCode": SUPER_CODE})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "super_admin");
}

#[tokio::test]
async fn reject_without_body_uses_default_reason() {
    let app = spawn().await;
    let (_, body) = app
        .send(
            "POST",
            "/api/auth/register-distributor",
            None,
            Some(json!({
                "tenantCode": "AG002",
                "agencyName": "Bharat Gas",
                "adminName": "Kiran",
                "adminPhone": "9876543211",
                "adminPassword": "pass1234",
            })),
        )
        .await;
    let request_id = body["data"]["requestId"].as_str().unwrap().to_string();

    let root = app.super_token().await;
    let (status, body) = app
        .send(
            "POST",
            &format!("/api/super-admin/reject-distributor/{request_id}"),
            Some(&root),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["rejectionReason"], "No reason provided");

    // Tenant admins may not review.
    let tenant = app.onboard("AG003", "9876543212", &[]).await;
    assert!(!tenant.is_empty());
    let admin = app.login("AG003", "9876543212", "pass1234").await;
    let (status, _) = app
        .send(
            "GET",
            "/api/super-admin/distributor-requests",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_registration_code_conflicts() {
    let app = spawn().await;
    app.onboard("AG004", "9876543213", &[]).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register-distributor",
            None,
            Some(json!({
                "tenantCode": "AG004",
                "agencyName": "Copy Gas",
                "adminName": "Someone",
                "adminPhone": "9876543214",
                "adminPassword": "pass1234",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ConflictError");
}
