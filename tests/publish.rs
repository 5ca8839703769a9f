use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use dispatch_planner::engine::draft::{DraftRoute, PlanningSettings};
use dispatch_planner::engine::publish::{
    CourierUpdate, DispatchPublisher, PublishRequest, StepOutcome,
};
use dispatch_planner::error::PublishError;
use dispatch_planner::models::audit::Actor;
use dispatch_planner::models::courier::{CourierProfile, CourierStatusRecord, GeoPoint};
use dispatch_planner::models::order::Order;
use dispatch_planner::engine::publish::StopStep;
use dispatch_planner::models::route::{RequiredCourierState, RouteHeader, RouteStatus};
use dispatch_planner::observability::metrics::Metrics;
use dispatch_planner::store::{DispatchStore, MemoryStore};

const TENANT: &str = "acme";

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn order(id: &str, lat: f64, weight: f64) -> Order {
    let mut order = Order::new(id, TENANT, format!("Cliente {id}"));
    order.address = format!("Calle {id} 123");
    order.location = Some(GeoPoint { lat, lng: -70.65 });
    order.weight_kg = Some(weight);
    order
}

fn orders() -> Vec<Order> {
    vec![
        order("A", -33.40, 40.0),
        order("B", -33.42, 40.0),
        order("C", -33.44, 40.0),
    ]
}

fn actor() -> Actor {
    Actor {
        id: "disp-1".to_string(),
        name: "Dana".to_string(),
        role: "dispatcher".to_string(),
    }
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new(64));
    for order in orders() {
        store.upsert_order(order).await.unwrap();
    }
    store
        .upsert_courier(CourierProfile {
            id: "c1".to_string(),
            display_name: "Ana".to_string(),
            role: "driver".to_string(),
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    store
        .upsert_courier_status(CourierStatusRecord {
            courier_id: "c1".to_string(),
            tenant_id: TENANT.to_string(),
            location: None,
            state: "available".to_string(),
            last_ping: Utc::now(),
        })
        .await
        .unwrap();
    store
}

fn draft() -> DraftRoute {
    let mut draft = DraftRoute::new(RouteHeader {
        name: "Providencia AM".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 3, 2),
        window_start: Some(hm(9, 0)),
        window_end: Some(hm(12, 0)),
        courier_id: Some("c1".to_string()),
        courier_name: Some("Ana".to_string()),
        required_courier_state: RequiredCourierState::Available,
        ..RouteHeader::default()
    });
    for order in orders() {
        draft.stops.add_stop(&order).unwrap();
    }
    draft
}

fn publisher(store: &Arc<MemoryStore>) -> DispatchPublisher {
    let store: Arc<dyn DispatchStore> = store.clone();
    DispatchPublisher::new(store, PlanningSettings::default(), Metrics::new())
}

fn request(status: RouteStatus) -> PublishRequest {
    PublishRequest {
        tenant_id: TENANT.to_string(),
        actor: actor(),
        status,
    }
}

fn validation_reasons(err: PublishError) -> Vec<String> {
    match err {
        PublishError::Validation(reasons) => reasons,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn publish_assigns_every_stop_in_sequence() {
    let store = seeded_store().await;
    let report = publisher(&store)
        .publish(&draft(), &request(RouteStatus::Published))
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.completed(), 3);
    assert_eq!(report.courier, CourierUpdate::MarkedReady);
    assert_eq!(report.route.status, RouteStatus::Published);
    assert!(report.route.published_at.is_some());
    assert_eq!(report.route.kpis.stop_count, 3);
    assert_eq!(report.route.kpis.total_kg, 120.0);

    for (position, id) in ["A", "B", "C"].iter().enumerate() {
        let order = store.order(id).await.unwrap().unwrap();
        assert_eq!(order.assigned_courier_id.as_deref(), Some("c1"));
        assert_eq!(order.route_id, Some(report.route.id));
        assert_eq!(order.route_sequence, Some(position + 1));
        assert_eq!(order.route_sequence_total, Some(3));
        assert_eq!(order.route_status, Some(RouteStatus::Published));
        let summary = order.assignment_summary.unwrap();
        assert_eq!(summary.label, format!("{}/3", position + 1));
    }

    let first = store.order("A").await.unwrap().unwrap();
    assert_eq!(
        first.assignment_summary.unwrap().eta.as_deref(),
        Some("09:00")
    );

    let trail = store.audit_trail("A", TENANT).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].actor, actor());
    assert!(trail[0]
        .changes
        .iter()
        .any(|change| change.field == "assigned_courier_id"));

    let status = store.courier_status("c1").await.unwrap().unwrap();
    assert_eq!(status.state, "ready_for_route");

    let saved = store.routes(TENANT).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].stops.len(), 3);
}

#[tokio::test]
async fn failed_stop_write_keeps_earlier_assignments() {
    let store = seeded_store().await;
    store.reject_writes_for("B");

    let report = publisher(&store)
        .publish(&draft(), &request(RouteStatus::Published))
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.completed(), 2);
    assert!(matches!(report.steps[0].outcome, StepOutcome::Assigned { .. }));
    assert!(matches!(
        report.steps[1].outcome,
        StepOutcome::WriteFailed { .. }
    ));
    assert!(matches!(report.steps[2].outcome, StepOutcome::Assigned { .. }));

    let failed: Vec<&str> = report.failed().map(|s| s.order_id.as_str()).collect();
    assert_eq!(failed, vec!["B"]);

    let a = store.order("A").await.unwrap().unwrap();
    let b = store.order("B").await.unwrap().unwrap();
    assert_eq!(a.assigned_courier_id.as_deref(), Some("c1"));
    assert_eq!(b.assigned_courier_id, None);
    assert!(store.audit_trail("B", TENANT).await.unwrap().is_empty());

    assert_eq!(report.courier, CourierUpdate::MarkedReady);
}

#[tokio::test]
async fn retrying_publish_only_fills_in_failed_stops() {
    let store = seeded_store().await;
    store.reject_writes_for("B");
    let publisher = publisher(&store);

    let first = publisher
        .publish(&draft(), &request(RouteStatus::Published))
        .await
        .unwrap();
    assert_eq!(first.completed(), 2);

    store.accept_writes_for("B");
    let mut retry = draft();
    retry.id = Some(first.route.id);
    let second = publisher
        .publish(&retry, &request(RouteStatus::Published))
        .await
        .unwrap();

    assert!(second.is_complete());
    assert_eq!(second.route.id, first.route.id);
    assert_eq!(
        second.steps[0].outcome,
        StepOutcome::Assigned { audit_id: None }
    );
    assert_eq!(store.audit_trail("A", TENANT).await.unwrap().len(), 1);
    assert_eq!(store.audit_trail("B", TENANT).await.unwrap().len(), 1);
    assert_eq!(store.route_count(), 1);
}

#[tokio::test]
async fn capacity_overage_refuses_publish_and_writes_nothing() {
    let store = seeded_store().await;
    let mut draft = draft();
    draft.header.vehicle.capacity.kg = Some(100.0);

    let err = publisher(&store)
        .publish(&draft, &request(RouteStatus::Published))
        .await
        .unwrap_err();

    let reasons = validation_reasons(err);
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("kg"));
    assert_eq!(store.route_count(), 0);
    assert_eq!(store.audit_count(), 0);
    let a = store.order("A").await.unwrap().unwrap();
    assert_eq!(a.assigned_courier_id, None);
}

#[tokio::test]
async fn denied_courier_refuses_publish() {
    let store = seeded_store().await;
    store.set_courier_state("c1", "denied").await.unwrap();

    let err = publisher(&store)
        .publish(&draft(), &request(RouteStatus::Published))
        .await
        .unwrap_err();

    let reasons = validation_reasons(err);
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("not available"));
}

#[tokio::test]
async fn empty_route_refuses_publish() {
    let store = seeded_store().await;
    let mut draft = draft();
    draft.stops = Default::default();

    let err = publisher(&store)
        .publish(&draft, &request(RouteStatus::Published))
        .await
        .unwrap_err();

    let reasons = validation_reasons(err);
    assert_eq!(reasons, vec!["route has no stops".to_string()]);
}

#[tokio::test]
async fn saved_draft_is_not_fanned_out_and_never_demoted() {
    let store = seeded_store().await;
    let publisher = publisher(&store);

    let saved = publisher
        .publish(&draft(), &request(RouteStatus::Draft))
        .await
        .unwrap();
    assert_eq!(saved.route.status, RouteStatus::Draft);
    assert!(saved.steps.is_empty());
    assert_eq!(saved.courier, CourierUpdate::Skipped);
    assert_eq!(saved.route.published_at, None);
    let a = store.order("A").await.unwrap().unwrap();
    assert_eq!(a.route_id, None);

    let mut draft = draft();
    draft.id = Some(saved.route.id);
    let published = publisher
        .publish(&draft, &request(RouteStatus::Published))
        .await
        .unwrap();
    assert_eq!(published.route.id, saved.route.id);
    assert_eq!(published.route.created_at, saved.route.created_at);

    let err = publisher
        .publish(&draft, &request(RouteStatus::Draft))
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::AlreadyPublished(id) if id == saved.route.id));
}

fn outcomes(steps: &[StopStep]) -> Vec<&StepOutcome> {
    steps.iter().map(|step| &step.outcome).collect()
}

#[tokio::test]
async fn order_of_another_tenant_refuses_publish() {
    let store = seeded_store().await;
    store
        .upsert_order(Order::new("X", "other", "Cliente X"))
        .await
        .unwrap();
    let mut foreign = order("X", -33.46, 1.0);
    foreign.tenant_id = "other".to_string();
    let mut draft = draft();
    draft.stops.add_stop(&foreign).unwrap();

    let err = publisher(&store)
        .publish(&draft, &request(RouteStatus::Published))
        .await
        .unwrap_err();

    let reasons = validation_reasons(err);
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("order X"));
    let x = store.order("X").await.unwrap().unwrap();
    assert_eq!(x.assigned_courier_id, None);
    assert!(store.audit_trail("X", "other").await.unwrap().is_empty());
    assert!(store.audit_trail("X", TENANT).await.unwrap().is_empty());
}

#[tokio::test]
async fn route_id_of_another_tenant_cannot_be_taken_over() {
    let store = seeded_store().await;
    let publisher = publisher(&store);
    let saved = publisher
        .publish(&draft(), &request(RouteStatus::Draft))
        .await
        .unwrap();

    let mut takeover = draft();
    takeover.id = Some(saved.route.id);
    let other = PublishRequest {
        tenant_id: "other".to_string(),
        actor: actor(),
        status: RouteStatus::Draft,
    };
    let err = publisher.publish(&takeover, &other).await.unwrap_err();

    assert!(matches!(err, PublishError::Store(_)));
    let routes = store.routes(TENANT).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].id, saved.route.id);
    assert!(store.routes("other").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_audit_append_still_counts_the_written_stop() {
    let store = seeded_store().await;
    store.reject_audits_for("B");

    let report = publisher(&store)
        .publish(&draft(), &request(RouteStatus::Published))
        .await
        .unwrap();

    assert!(matches!(
        outcomes(&report.steps)[..],
        [
            StepOutcome::Assigned { audit_id: Some(_) },
            StepOutcome::AuditFailed { .. },
            StepOutcome::Assigned { audit_id: Some(_) },
        ]
    ));
    assert_eq!(report.completed(), 3);
    assert!(!report.is_complete());

    let b = store.order("B").await.unwrap().unwrap();
    assert_eq!(b.assigned_courier_id.as_deref(), Some("c1"));
    assert!(store.audit_trail("B", TENANT).await.unwrap().is_empty());
}

#[tokio::test]
async fn courier_without_status_record_is_reported_as_failed_update() {
    let store = Arc::new(MemoryStore::new(64));
    for order in orders() {
        store.upsert_order(order).await.unwrap();
    }
    store
        .upsert_courier(CourierProfile {
            id: "c1".to_string(),
            display_name: "Ana".to_string(),
            role: "driver".to_string(),
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    let mut draft = draft();
    draft.header.required_courier_state = RequiredCourierState::Any;

    let report = publisher(&store)
        .publish(&draft, &request(RouteStatus::Published))
        .await
        .unwrap();

    assert!(matches!(report.courier, CourierUpdate::Failed { .. }));
    assert_eq!(report.completed(), 3);
    assert_eq!(report.failed().count(), 0);
    assert!(!report.is_complete());
}
