//! Integration tests for the lead flows: outbound push, inbound refresh,
//! status reconciliation and conflict resolution.

use easycars_sync::models::{Lead, LeadStatusConflict, SyncLog};
use easycars_sync::models::{lead, lead_status_conflict, sync_log};
use easycars_sync::sync::conflict::Resolution;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{ScriptedTransport, insert_credential, insert_lead, setup_state, test_config};

const CREATE_LEAD_PATH: &str = "/Lead/CreateLead";
const UPDATE_STATUS_PATH: &str = "/Lead/UpdateLeadStatus";
const LEAD_DETAIL_PATH: &str = "/Lead/GetLeadDetail";

#[tokio::test]
async fn lead_sync_creates_and_links_unlinked_lead() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        CREATE_LEAD_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-100", "customerNo": "C-9" }),
    );
    // Inbound refresh of the freshly linked lead.
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({
            "responseCode": 0,
            "leadNumber": "L-100",
            "customerName": "Taylor Example",
            "rating": "hot",
            "status": 10
        }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "received", None)
        .await
        .unwrap();

    let report = state
        .leads
        .run_lead_sync(dealership_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "success");

    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.easycars_lead_number.as_deref(), Some("L-100"));
    assert_eq!(refreshed.easycars_customer_no.as_deref(), Some("C-9"));
    assert_eq!(refreshed.rating.as_deref(), Some("hot"));
    assert_eq!(refreshed.last_known_easycars_status, Some(10));
    assert!(refreshed.synced_at.is_some());
    assert!(refreshed.raw_payload.is_some());
}

#[tokio::test]
async fn status_push_records_observation() {
    let transport = ScriptedTransport::new();
    transport.push_ok(UPDATE_STATUS_PATH, json!({ "responseCode": 0 }));

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "won", Some("L-7"))
        .await
        .unwrap();

    let report = state
        .leads
        .sync_lead_status_to_easycars(dealership_id, created.id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "success");

    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.last_known_easycars_status, Some(50));
    assert!(refreshed.status_synced_at.is_some());

    // The single status push is audited under its own sync type.
    let logs = SyncLog::find()
        .filter(sync_log::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].sync_type, "lead_status_outbound");
}

#[tokio::test]
async fn single_lead_push_is_audited_as_outbound() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        CREATE_LEAD_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-20", "customerNo": "C-20" }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "received", None)
        .await
        .unwrap();

    let report = state
        .leads
        .sync_lead_to_easycars(dealership_id, created.id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "success");

    let logs = SyncLog::find()
        .filter(sync_log::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].sync_type, "lead_outbound");
}

#[tokio::test]
async fn reconciliation_records_one_open_conflict_under_manual_review() {
    let transport = ScriptedTransport::new();
    // Two reconciliation passes, each seeing the same divergent status.
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-1", "status": 60 }),
    );
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-1", "status": 60 }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "in_progress", Some("L-1"))
        .await
        .unwrap();

    for _ in 0..2 {
        let report = state
            .leads
            .sync_lead_statuses_from_easycars(dealership_id, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status.as_str(), "success");
    }

    // The second pass refreshes the open conflict instead of stacking one.
    let conflicts = LeadStatusConflict::find()
        .filter(lead_status_conflict::Column::LeadId.eq(created.id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);
    assert!(!conflicts[0].is_resolved);
    assert_eq!(conflicts[0].remote_status_code, 60);
    assert_eq!(conflicts[0].local_status, "in_progress");

    // The local lead is untouched while the conflict is open.
    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, "in_progress");
}

#[tokio::test]
async fn reconciliation_applies_remote_status_under_remote_wins() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-2", "status": 50 }),
    );

    let mut config = test_config();
    config.conflict_strategy = "remote_wins".to_string();
    let state = setup_state(config, transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "received", Some("L-2"))
        .await
        .unwrap();

    state
        .leads
        .sync_lead_statuses_from_easycars(dealership_id, &CancellationToken::new())
        .await
        .unwrap();

    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, "won");
    assert_eq!(refreshed.last_known_easycars_status, Some(50));

    let conflicts = LeadStatusConflict::find()
        .filter(lead_status_conflict::Column::LeadId.eq(created.id))
        .all(&*state.db)
        .await
        .unwrap();
    assert!(conflicts.is_empty());
}

#[tokio::test]
async fn remote_wins_records_conflict_for_illegal_transition() {
    let transport = ScriptedTransport::new();
    // Remote claims the deleted lead is back in progress.
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-3", "status": 30 }),
    );

    let mut config = test_config();
    config.conflict_strategy = "remote_wins".to_string();
    let state = setup_state(config, transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "deleted", Some("L-3"))
        .await
        .unwrap();

    state
        .leads
        .sync_lead_statuses_from_easycars(dealership_id, &CancellationToken::new())
        .await
        .unwrap();

    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, "deleted");

    let conflicts = LeadStatusConflict::find()
        .filter(lead_status_conflict::Column::LeadId.eq(created.id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);
}

#[tokio::test]
async fn resolving_conflict_remote_applies_status_and_closes() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-4", "status": 50 }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let created = insert_lead(&state.db, dealership_id, "in_progress", Some("L-4"))
        .await
        .unwrap();

    state
        .leads
        .sync_lead_statuses_from_easycars(dealership_id, &CancellationToken::new())
        .await
        .unwrap();

    let conflict = LeadStatusConflict::find()
        .filter(lead_status_conflict::Column::LeadId.eq(created.id))
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();

    let resolved = state
        .leads
        .resolver()
        .resolve(&dealership_id, conflict, Resolution::Remote, "ops@example.com")
        .await
        .unwrap();
    assert!(resolved.is_resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("remote"));
    assert_eq!(resolved.resolved_by.as_deref(), Some("ops@example.com"));

    let refreshed = Lead::find_by_id(created.id)
        .one(&*state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, "won");
}

#[tokio::test]
async fn outbound_failures_produce_partial_report() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        CREATE_LEAD_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-10" }),
    );
    // Second create is rejected outright.
    transport.push_ok(
        CREATE_LEAD_PATH,
        json!({ "responseCode": 7, "message": "missing customer" }),
    );
    transport.push_ok(
        LEAD_DETAIL_PATH,
        json!({ "responseCode": 0, "leadNumber": "L-10", "status": 10 }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    insert_lead(&state.db, dealership_id, "received", None)
        .await
        .unwrap();
    insert_lead(&state.db, dealership_id, "received", None)
        .await
        .unwrap();

    let report = state
        .leads
        .run_lead_sync(dealership_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "partial_success");
    assert_eq!(report.items_failed, 1);

    let linked = Lead::find()
        .filter(lead::Column::DealershipId.eq(dealership_id))
        .filter(lead::Column::EasycarsLeadNumber.is_not_null())
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
}
