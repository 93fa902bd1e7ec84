//! Registration request and export staging repositories.

mod common;

use chrono::{Duration, Utc};
use fieldops_core::error::FieldOpsError;
use fieldops_core::models::export::CreateExport;
use fieldops_core::models::registration::{
    CreateRegistration, FailedAgentEntry, RegistrationStatus, ReviewDecision, StagedAgent,
};
use fieldops_core::repository::{ExportRepository, Pagination, RegistrationRepository};
use fieldops_db::repository::{SurrealExportRepository, SurrealRegistrationRepository};
use uuid::Uuid;

fn request(code: &str) -> CreateRegistration {
    CreateRegistration {
        code: code.into(),
        agency_name: "Shree Gas".into(),
        admin_name: "Owner".into(),
        admin_phone: "9000000000".into(),
        admin_password_hash: "$argon2id$admin".into(),
        agents: vec![StagedAgent {
            name: "Ravi".into(),
            phone: "9876543210".into(),
            password_hash: "$argon2id$agent".into(),
        }],
    }
}

#[tokio::test]
async fn staged_agent_hashes_survive_storage() {
    let db = common::setup().await;
    let repo = SurrealRegistrationRepository::new(db);

    let created = repo.create(request("AG009")).await.unwrap();
    assert_eq!(created.status, RegistrationStatus::Pending);

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.admin_password_hash, "$argon2id$admin");
    assert_eq!(fetched.agents[0].password_hash, "$argon2id$agent");

    let pending = repo.find_pending_by_code("AG009").await.unwrap();
    assert_eq!(pending.map(|r| r.id), Some(created.id));
    assert!(repo.find_pending_by_code("NOPE").await.unwrap().is_none());
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn completion_happens_exactly_once() {
    let db = common::setup().await;
    let repo = SurrealRegistrationRepository::new(db);
    let created = repo.create(request("AG009")).await.unwrap();
    let tenant_id = Uuid::new_v4();

    let decision = ReviewDecision {
        status: RegistrationStatus::PartiallyApproved,
        reviewed_by: "super_admin".into(),
        rejection_reason: None,
        tenant_id: Some(tenant_id),
        failed_agents: vec![FailedAgentEntry {
            name: "Ravi".into(),
            phone: "9876543210".into(),
            reason: "duplicate".into(),
        }],
    };
    let done = repo
        .complete(created.id, decision.clone())
        .await
        .unwrap()
        .expect("first completion applies");
    assert_eq!(done.status, RegistrationStatus::PartiallyApproved);
    assert_eq!(done.tenant_id, Some(tenant_id));
    assert_eq!(done.failed_agents.len(), 1);
    assert!(done.reviewed_at.is_some());

    let again = repo
        .complete(
            created.id,
            ReviewDecision {
                status: RegistrationStatus::Rejected,
                ..decision
            },
        )
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(repo.count_pending().await.unwrap(), 0);
    assert!(repo.find_pending_by_code("AG009").await.unwrap().is_none());
}

#[tokio::test]
async fn a_code_has_one_pending_request_at_a_time() {
    let db = common::setup().await;
    let repo = SurrealRegistrationRepository::new(db);
    let first = repo.create(request("AG009")).await.unwrap();

    let (a, b) = tokio::join!(repo.create(request("AG010")), repo.create(request("AG010")));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let err = repo.create(request("AG009")).await.unwrap_err();
    assert!(matches!(err, FieldOpsError::AlreadyExists { .. }));
    assert_eq!(repo.count_pending().await.unwrap(), 2);

    // Deciding a request frees its code for a new submission.
    repo.complete(
        first.id,
        ReviewDecision {
            status: RegistrationStatus::Rejected,
            reviewed_by: "super_admin".into(),
            rejection_reason: Some("incomplete".into()),
            tenant_id: None,
            failed_agents: Vec::new(),
        },
    )
    .await
    .unwrap();
    let again = repo.create(request("AG009")).await.unwrap();
    assert_eq!(again.status, RegistrationStatus::Pending);
}

#[tokio::test]
async fn requests_list_by_status() {
    let db = common::setup().await;
    let repo = SurrealRegistrationRepository::new(db);
    let first = repo.create(request("AG001")).await.unwrap();
    repo.create(request("AG002")).await.unwrap();
    repo.complete(
        first.id,
        ReviewDecision {
            status: RegistrationStatus::Rejected,
            reviewed_by: "super_admin".into(),
            rejection_reason: Some("incomplete".into()),
            tenant_id: None,
            failed_agents: Vec::new(),
        },
    )
    .await
    .unwrap();

    let pending = repo
        .list(Some(RegistrationStatus::Pending), Pagination::default())
        .await
        .unwrap();
    assert_eq!(pending.total, 1);
    assert_eq!(pending.items[0].code, "AG002");

    let all = repo.list(None, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 2);
}

#[tokio::test]
async fn exports_are_stored_fetched_and_purged() {
    let db = common::setup().await;
    let repo = SurrealExportRepository::new(db);
    let now = Utc::now();

    let live = repo
        .create(CreateExport {
            owner: "tenant".into(),
            file_name: "inspections.csv".into(),
            csv: "a,b\n1,2\n".into(),
            record_count: 1,
            expires_at: now + Duration::minutes(10),
        })
        .await
        .unwrap();
    let stale = repo
        .create(CreateExport {
            owner: "tenant".into(),
            file_name: "old.csv".into(),
            csv: String::new(),
            record_count: 0,
            expires_at: now - Duration::minutes(1),
        })
        .await
        .unwrap();

    assert_eq!(repo.get(live.id).await.unwrap().csv, "a,b\n1,2\n");
    assert_eq!(repo.purge_expired(now).await.unwrap(), 1);
    assert!(matches!(
        repo.get(stale.id).await,
        Err(FieldOpsError::NotFound { .. })
    ));

    repo.delete(live.id).await.unwrap();
    assert!(repo.get(live.id).await.is_err());
}
