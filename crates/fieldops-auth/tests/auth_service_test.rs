//! Integration tests for the authentication service.

use fieldops_auth::config::{AuthConfig, SuperAdminConfig};
use fieldops_auth::password::hash_password;
use fieldops_auth::service::{AuthService, CodeOwner, LoginInput, Principal};
use fieldops_core::error::FieldOpsError;
use fieldops_core::models::agent::{CreateAgent, UpdateAgent};
use fieldops_core::models::claims::{Claims, Role};
use fieldops_core::models::tenant::{AppSettings, CreateTenant, Tenant, UpdateTenant};
use fieldops_core::repository::{AgentRepository, TenantRepository};
use fieldops_core::scope::Predicate;
use fieldops_db::repository::{SurrealAgentRepository, SurrealTenantRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service = AuthService<SurrealTenantRepository<Db>, SurrealAgentRepository<Db>>;

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret-value-0123".into(),
        jwt_issuer: "fieldops-test".into(),
        super_admin: Some(SuperAdminConfig {
            code: "000000".into(),
            phone: "9999999999".into(),
            password_hash: hash_password("root-pass", None).unwrap(),
            name: "Platform Owner".into(),
        }),
        ..Default::default()
    }
}

struct Fixture {
    service: Service,
    tenants: SurrealTenantRepository<Db>,
    agents: SurrealAgentRepository<Db>,
    tenant: Tenant,
    agent_id: Uuid,
}

/// In-memory DB with one tenant (admin 9000000000 / admin-pass) and one
/// agent (9876543210 / agent-pass).
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fieldops_db::run_migrations(&db).await.unwrap();

    let tenants = SurrealTenantRepository::new(db.clone());
    let agents = SurrealAgentRepository::new(db.clone());

    let tenant = tenants
        .create(CreateTenant {
            code: "AG001".into(),
            agency_name: "Shree Gas".into(),
            admin_name: "Owner".into(),
            admin_phone: "9000000000".into(),
            admin_password_hash: hash_password("admin-pass", None).unwrap(),
            app_settings: AppSettings::default(),
        })
        .await
        .unwrap();
    let agent = agents
        .create(CreateAgent {
            tenant_id: tenant.id,
            name: "Ravi".into(),
            phone: "9876543210".into(),
            password_hash: hash_password("agent-pass", None).unwrap(),
        })
        .await
        .unwrap();

    Fixture {
        service: AuthService::new(tenants.clone(), agents.clone(), test_config()),
        tenants,
        agents,
        tenant,
        agent_id: agent.id,
    }
}

fn login(code: &str, phone: &str, password: &str) -> LoginInput {
    LoginInput {
        tenant_code: code.into(),
        phone: phone.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn tenant_admin_login_issues_verifiable_token() {
    let f = setup().await;

    let out = f
        .service
        .login(login("ag001", "90000 00000", "admin-pass"))
        .await
        .unwrap();
    assert_eq!(out.expires_in, 86_400);
    assert!(matches!(out.principal, Principal::TenantAdmin { .. }));

    let claims = f.service.verify_token(&out.token).unwrap();
    assert_eq!(claims, Claims::tenant_admin(f.tenant.id, "AG001"));
}

#[tokio::test]
async fn agent_login_carries_tenant_and_agent() {
    let f = setup().await;

    let out = f
        .service
        .login(login("AG001", "9876543210", "agent-pass"))
        .await
        .unwrap();
    let claims = f.service.verify_token(&out.token).unwrap();
    assert_eq!(claims.role, Role::Agent);
    assert_eq!(claims.tenant_id, Some(f.tenant.id));
    assert_eq!(claims.agent_id, Some(f.agent_id));

    match f.service.profile(&claims).await.unwrap() {
        Principal::Agent { agent, tenant_name } => {
            assert_eq!(agent.id, f.agent_id);
            assert_eq!(tenant_name, "Shree Gas");
        }
        other => panic!("unexpected principal {other:?}"),
    }
}

#[tokio::test]
async fn super_admin_matches_before_any_tenant() {
    let f = setup().await;

    let out = f
        .service
        .login(login("000000", "9999999999", "root-pass"))
        .await
        .unwrap();
    let claims = f.service.verify_token(&out.token).unwrap();
    assert!(claims.is_super_admin());
    assert_eq!(claims.tenant_id, None);
}

#[tokio::test]
async fn wrong_password_or_unknown_code_is_unauthenticated() {
    let f = setup().await;

    for input in [
        login("AG001", "9876543210", "wrong"),
        login("AG001", "9000000000", "wrong"),
        login("NOPE1", "9876543210", "agent-pass"),
        login("AG001", "9111111111", "agent-pass"),
    ] {
        let err = f.service.login(input).await.unwrap_err();
        assert!(
            matches!(err, FieldOpsError::AuthenticationFailed { .. }),
            "{err}"
        );
    }
}

#[tokio::test]
async fn inactive_accounts_are_forbidden_after_password_check() {
    let f = setup().await;
    f.agents
        .update(
            &Predicate::All,
            f.agent_id,
            UpdateAgent {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = f
        .service
        .login(login("AG001", "9876543210", "agent-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, FieldOpsError::AuthorizationDenied { .. }), "{err}");

    // A wrong password on an inactive account still reads as bad credentials.
    let err = f
        .service
        .login(login("AG001", "9876543210", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, FieldOpsError::AuthenticationFailed { .. }), "{err}");
}

#[tokio::test]
async fn validate_code_identifies_login_class() {
    let f = setup().await;

    assert!(matches!(
        f.service.validate_code("000000").await.unwrap(),
        CodeOwner::SuperAdmin
    ));
    match f.service.validate_code("ag001").await.unwrap() {
        CodeOwner::TenantAdmin { name, tenant_id } => {
            assert_eq!(name, "Shree Gas");
            assert_eq!(tenant_id, f.tenant.id);
        }
        other => panic!("unexpected owner {other:?}"),
    }

    f.tenants
        .update(
            f.tenant.id,
            UpdateTenant {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        f.service.validate_code("AG001").await,
        Err(FieldOpsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn agent_password_change_requires_current_password() {
    let f = setup().await;
    let own = Claims::agent(f.tenant.id, f.agent_id, "AG001");

    let err = f
        .service
        .change_agent_password(&own, f.agent_id, Some("wrong"), "fresh-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, FieldOpsError::Validation { .. }));

    f.service
        .change_agent_password(&own, f.agent_id, Some("agent-pass"), "fresh-pass")
        .await
        .unwrap();
    f.service
        .login(login("AG001", "9876543210", "fresh-pass"))
        .await
        .unwrap();

    // The tenant admin resets without the current password.
    let admin = Claims::tenant_admin(f.tenant.id, "AG001");
    f.service
        .change_agent_password(&admin, f.agent_id, None, "reset-pass")
        .await
        .unwrap();
    f.service
        .login(login("AG001", "9876543210", "reset-pass"))
        .await
        .unwrap();

    // Another tenant's admin cannot see the agent at all.
    let stranger = Claims::tenant_admin(Uuid::new_v4(), "AG002");
    assert!(matches!(
        f.service
            .change_agent_password(&stranger, f.agent_id, None, "evil-pass")
            .await,
        Err(FieldOpsError::NotFound { .. })
    ));
}
