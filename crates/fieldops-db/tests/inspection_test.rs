//! Inspection repository against in-memory SurrealDB.

mod common;

use chrono::{Duration, Utc};
use fieldops_core::models::inspection::{
    Consumer, CreateInspection, InspectionContent, InspectionStatus, LineItem, Location,
    SafetyAnswer, SafetyQuestion,
};
use fieldops_core::repository::{InspectionQuery, InspectionRepository};
use fieldops_core::scope::Predicate;
use fieldops_db::repository::SurrealInspectionRepository;
use uuid::Uuid;

fn content(name: &str, failed: bool, total: f64) -> InspectionContent {
    let answer = if failed { SafetyAnswer::No } else { SafetyAnswer::Yes };
    InspectionContent {
        consumer: Consumer {
            name: name.into(),
            consumer_number: "C-100".into(),
            mobile_number: "9123456789".into(),
            address: "12 Main Road".into(),
        },
        safety_questions: vec![SafetyQuestion {
            question_id: 0,
            question: "Regulator OK?".into(),
            answer,
        }],
        suraksha_hose_due_date: Some("2026-12".into()),
        images: Vec::new(),
        products: vec![LineItem {
            product_id: Some(Uuid::new_v4()),
            name: "Hose".into(),
            price: total,
            quantity: 1,
            subtotal: total,
        }],
        hotplate_exchange: false,
        other_discount: 0.0,
        subtotal_amount: total,
        total_discount: 0.0,
        total_amount: total,
        location: Some(Location {
            latitude: 19.07,
            longitude: 72.87,
            address: None,
            accuracy: Some(12.5),
        }),
        status: if failed {
            InspectionStatus::IssuesFound
        } else {
            InspectionStatus::Completed
        },
        passed_questions: u32::from(!failed),
        failed_questions: u32::from(failed),
        inspection_date: Utc::now(),
    }
}

#[tokio::test]
async fn display_ids_are_sequential_across_tenants() {
    let db = common::setup().await;
    let repo = SurrealInspectionRepository::new(db.clone());
    let a = common::tenant(&db, "AG001").await;
    let b = common::tenant(&db, "AG002").await;
    let agent_a = common::agent(&db, &a, "9876543210").await;
    let agent_b = common::agent(&db, &b, "9876543211").await;

    let first = repo
        .create(CreateInspection {
            tenant_id: a.id,
            agent_id: agent_a.id,
            content: content("Asha", false, 100.0),
        })
        .await
        .unwrap();
    let second = repo
        .create(CreateInspection {
            tenant_id: b.id,
            agent_id: agent_b.id,
            content: content("Ravi", true, 50.0),
        })
        .await
        .unwrap();

    let year = Utc::now().format("%Y").to_string();
    assert_eq!(first.inspection_id, format!("INS-{year}-0001"));
    assert_eq!(second.inspection_id, format!("INS-{year}-0002"));
    assert_eq!(first.content, content_of(&repo, a.id, first.id).await);
}

async fn content_of(
    repo: &SurrealInspectionRepository<surrealdb::engine::local::Db>,
    tenant_id: Uuid,
    id: Uuid,
) -> InspectionContent {
    repo.get_by_id(&Predicate::Tenant(tenant_id), id)
        .await
        .unwrap()
        .content
}

#[tokio::test]
async fn agents_only_see_their_own_inspections() {
    let db = common::setup().await;
    let repo = SurrealInspectionRepository::new(db.clone());
    let tenant = common::tenant(&db, "AG001").await;
    let one = common::agent(&db, &tenant, "9876543210").await;
    let two = common::agent(&db, &tenant, "9876543211").await;

    let theirs = repo
        .create(CreateInspection {
            tenant_id: tenant.id,
            agent_id: two.id,
            content: content("Ravi", false, 10.0),
        })
        .await
        .unwrap();
    repo.create(CreateInspection {
        tenant_id: tenant.id,
        agent_id: one.id,
        content: content("Asha", false, 10.0),
    })
    .await
    .unwrap();

    let own = Predicate::Agent {
        tenant_id: tenant.id,
        agent_id: one.id,
    };
    let listed = repo.list(&own, InspectionQuery::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].content.consumer.name, "Asha");
    assert!(repo.get_by_id(&own, theirs.id).await.is_err());
    assert!(repo.delete(&own, theirs.id).await.is_err());
}

#[tokio::test]
async fn list_filters_and_summary() {
    let db = common::setup().await;
    let repo = SurrealInspectionRepository::new(db.clone());
    let tenant = common::tenant(&db, "AG001").await;
    let agent = common::agent(&db, &tenant, "9876543210").await;
    let scope = Predicate::Tenant(tenant.id);

    for (name, failed, total) in [("Asha", false, 100.0), ("Ravi", true, 40.0), ("Meena", false, 60.0)] {
        repo.create(CreateInspection {
            tenant_id: tenant.id,
            agent_id: agent.id,
            content: content(name, failed, total),
        })
        .await
        .unwrap();
    }

    let issues = repo
        .list(
            &scope,
            InspectionQuery {
                status: Some(InspectionStatus::IssuesFound),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(issues.total, 1);
    assert_eq!(issues.items[0].content.consumer.name, "Ravi");

    let searched = repo
        .list(
            &scope,
            InspectionQuery {
                search: Some("mee".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(searched.total, 1);

    let future = repo
        .list(
            &scope,
            InspectionQuery {
                from: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(future.total, 0);

    let summary = repo.summary(&scope, None).await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.issues_found, 1);
    assert_eq!(summary.total_sales, 200.0);

    let empty = repo
        .summary(&Predicate::Tenant(Uuid::new_v4()), None)
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
}

#[tokio::test]
async fn activity_is_scoped_and_windowed() {
    let db = common::setup().await;
    let repo = SurrealInspectionRepository::new(db.clone());
    let tenant = common::tenant(&db, "AG001").await;
    let other = common::tenant(&db, "AG002").await;
    let one = common::agent(&db, &tenant, "9876543210").await;
    let two = common::agent(&db, &tenant, "9876543211").await;
    let outsider = common::agent(&db, &other, "9876543212").await;

    for (tenant_id, agent_id, total) in [
        (tenant.id, one.id, 100.0),
        (tenant.id, two.id, 40.0),
        (other.id, outsider.id, 75.0),
    ] {
        repo.create(CreateInspection {
            tenant_id,
            agent_id,
            content: content("Asha", false, total),
        })
        .await
        .unwrap();
    }
    let since = Utc::now() - Duration::days(1);

    let all = repo.activity(&Predicate::All, since).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    let tenant_points = repo.activity(&Predicate::Tenant(tenant.id), since).await.unwrap();
    assert_eq!(tenant_points.iter().map(|p| p.total_amount).sum::<f64>(), 140.0);

    let own = Predicate::Agent {
        tenant_id: tenant.id,
        agent_id: two.id,
    };
    let mine = repo.activity(&own, since).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].agent_id, two.id);

    let later = repo
        .activity(&Predicate::All, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(later.is_empty());
    assert!(repo.activity(&Predicate::Denied, since).await.is_err());
}

#[tokio::test]
async fn update_replaces_content_and_delete_returns_record() {
    let db = common::setup().await;
    let repo = SurrealInspectionRepository::new(db.clone());
    let tenant = common::tenant(&db, "AG001").await;
    let agent = common::agent(&db, &tenant, "9876543210").await;
    let scope = Predicate::Tenant(tenant.id);

    let created = repo
        .create(CreateInspection {
            tenant_id: tenant.id,
            agent_id: agent.id,
            content: content("Asha", false, 100.0),
        })
        .await
        .unwrap();

    let mut revised = created.content.clone();
    revised.consumer.address = "14 Lake View".into();
    revised.location = None;
    let updated = repo.update(&scope, created.id, revised.clone()).await.unwrap();
    assert_eq!(updated.content, revised);
    assert_eq!(updated.inspection_id, created.inspection_id);
    assert_eq!(updated.agent_id, agent.id);

    let removed = repo.delete(&scope, created.id).await.unwrap();
    assert_eq!(removed.id, created.id);
    assert!(repo.get_by_id(&scope, created.id).await.is_err());
}
