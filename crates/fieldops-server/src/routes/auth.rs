//! Login, code discovery, tenant self-registration and profile.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Router};
use fieldops_auth::LoginInput;
use fieldops_auth::registration::{AgentInput, RegistrationInput};
use fieldops_auth::service::{CodeOwner, Principal};
use fieldops_core::models::agent::Agent;
use fieldops_core::models::claims::{Claims, Role};
use fieldops_core::service::NewAgent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{Body, Reply};
use crate::state::AppState;

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/validate-sap", post(validate_code))
        .route("/auth/register-distributor", post(register_tenant))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(profile))
        .route("/auth/register", post(register_agent))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    #[serde(alias = "sapCode")]
    tenant_code: String,
    phone: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    token: String,
    expires_in: u64,
    role: Role,
    user: Principal,
}

async fn login(
    State(state): State<AppState>,
    Body(body): Body<LoginBody>,
) -> ApiResult<Reply<LoginReply>> {
    let out = state
        .auth
        .login(LoginInput {
            tenant_code: body.tenant_code,
            phone: body.phone,
            password: body.password,
        })
        .await?;

    Ok(Reply::ok(
        "Login successful",
        LoginReply {
            token: out.token,
            expires_in: out.expires_in,
            role: out.claims.role,
            user: out.principal,
        },
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeBody {
    #[serde(alias = "sapCode")]
    tenant_code: String,
}

async fn validate_code(
    State(state): State<AppState>,
    Body(body): Body<CodeBody>,
) -> ApiResult<Reply<CodeOwner>> {
    let owner = state.auth.validate_code(&body.tenant_code).await?;
    Ok(Reply::ok("Code is valid", owner))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentBody {
    name: String,
    phone: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationBody {
    #[serde(alias = "sapCode")]
    tenant_code: String,
    agency_name: String,
    admin_name: Option<String>,
    admin_phone: String,
    admin_password: String,
    #[serde(default)]
    agents: Vec<AgentBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationReply {
    request_id: Uuid,
    status: &'static str,
}

async fn register_tenant(
    State(state): State<AppState>,
    Body(body): Body<RegistrationBody>,
) -> ApiResult<Reply<RegistrationReply>> {
    let request = state
        .registrations
        .submit(RegistrationInput {
            code: body.tenant_code,
            agency_name: body.agency_name,
            admin_name: body.admin_name,
            admin_phone: body.admin_phone,
            admin_password: body.admin_password,
            agents: body
                .agents
                .into_iter()
                .map(|a| AgentInput {
                    name: a.name,
                    phone: a.phone,
                    password: a.password,
                })
                .collect(),
        })
        .await?;

    Ok(Reply::created(
        "Registration submitted for approval",
        RegistrationReply {
            request_id: request.id,
            status: request.status.as_str(),
        },
    ))
}

async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Reply<Principal>> {
    let principal = state.auth.profile(&claims).await?;
    Ok(Reply::ok("Profile retrieved", principal))
}

/// Body shared by agent creation endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewAgentBody {
    pub name: String,
    pub phone: String,
    pub password: String,
    /// Required for super-admin callers only.
    pub tenant_id: Option<Uuid>,
}

pub(crate) async fn create_agent(
    state: &AppState,
    claims: &Claims,
    body: NewAgentBody,
) -> ApiResult<Reply<Agent>> {
    let password_hash = state.auth.hash_new_password(&body.password)?;
    let agent = state
        .agents
        .create(
            claims,
            NewAgent {
                tenant_id: body.tenant_id,
                name: body.name,
                phone: body.phone,
                password_hash,
            },
        )
        .await?;
    Ok(Reply::created("Delivery man created", agent))
}

async fn register_agent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Body(body): Body<NewAgentBody>,
) -> ApiResult<Reply<Agent>> {
    create_agent(&state, &claims, body).await
}
