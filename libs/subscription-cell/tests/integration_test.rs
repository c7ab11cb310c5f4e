use std::sync::Arc;
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use subscription_cell::{
    ClaimNotifier, ClaimRecordedEvent, PrivilegeRules, PrivilegeService, SubscriptionError,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn service_for(server: &MockServer) -> PrivilegeService {
    let config = TestConfig::with_url(server.uri()).to_app_config();
    PrivilegeService::with_client(
        Arc::new(SupabaseClient::new(&config)),
        PrivilegeRules::from_config(&config),
    )
}

async fn mount_subscription(server: &MockServer, patient_id: Uuid, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/subscriptions"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "eq.active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

async fn mount_last_claim(server: &MockServer, patient_id: Uuid, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/claims"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("order", "claimed_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mount_lab_test(server: &MockServer, test_id: Uuid, clinic_id: Uuid, price: f64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", format!("eq.{}", test_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lab_test(test_id, clinic_id, price)
        ])))
        .mount(server)
        .await;
}

// ==============================================================================
// TEST USAGE PATH
// ==============================================================================

#[tokio::test]
async fn test_subscription_started_50_hours_ago_is_not_yet_usable() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    mount_subscription(
        &server,
        patient_id,
        MockSupabaseResponses::subscription(patient_id, "standard", 0.0, &iso(now() - Duration::hours(50))),
    )
    .await;

    let err = service_for(&server).can_use_at(patient_id, now()).await.unwrap_err();

    assert_eq!(err, SubscriptionError::ActivationPending(22));
    assert!(err.to_string().contains("usable in 22 hour(s)"));
}

#[tokio::test]
async fn test_missing_paid_subscription_is_not_found() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/subscriptions"))
        .and(query_param("is_paid", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = service_for(&server).can_use_at(patient_id, now()).await;
    assert_matches!(result, Err(SubscriptionError::SubscriptionNotFound));
}

#[tokio::test]
async fn test_record_usage_appends_date_and_spends_quota() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let row = MockSupabaseResponses::subscription(patient_id, "standard", 0.0, &iso(now() - Duration::days(20)));
    mount_subscription(&server, patient_id, row.clone()).await;

    let mut updated = row.clone();
    updated["remaining_tests"] = json!(1);
    updated["last_test_dates"] = json!([iso(now())]);
    updated["version"] = json!(2);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/subscriptions"))
        .and(query_param("version", "eq.1"))
        .and(body_partial_json(json!({ "remaining_tests": 1, "version": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let subscription = service_for(&server)
        .record_test_usage_at(patient_id, now())
        .await
        .unwrap();

    assert_eq!(subscription.remaining_tests, 1);
    assert_eq!(subscription.last_test_dates, vec![now()]);
}

#[tokio::test]
async fn test_concurrent_usage_update_is_conflict() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    mount_subscription(
        &server,
        patient_id,
        MockSupabaseResponses::subscription(patient_id, "standard", 0.0, &iso(now() - Duration::days(20))),
    )
    .await;

    // Another writer bumped the version first: the conditional PATCH matches nothing.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = service_for(&server).record_test_usage_at(patient_id, now()).await;
    assert_matches!(result, Err(SubscriptionError::ConcurrentUpdate));
}

// ==============================================================================
// CLAIM PATH
// ==============================================================================

#[tokio::test]
async fn test_claim_above_privilege_is_payment_required_and_writes_nothing() {
    let server = MockServer::start().await;
    let (patient_id, clinic_id, test_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    mount_subscription(
        &server,
        patient_id,
        MockSupabaseResponses::subscription(patient_id, "premium", 5000.0, &iso(now() - Duration::days(60))),
    )
    .await;
    mount_lab_test(&server, test_id, clinic_id, 6000.0).await;
    mount_last_claim(&server, patient_id, json!([])).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = service_for(&server)
        .record_claim_at(clinic_id, patient_id, test_id, now())
        .await;

    assert_matches!(
        result,
        Err(SubscriptionError::InsufficientPrivilege { balance, required })
            if balance == 5000.0 && required == 6000.0
    );
}

#[tokio::test]
async fn test_standard_plan_cannot_claim() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/subscriptions"))
        .and(query_param("plan_name", "eq.premium"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = service_for(&server)
        .record_claim_at(Uuid::new_v4(), patient_id, Uuid::new_v4(), now())
        .await;

    assert_matches!(result, Err(SubscriptionError::PremiumNotFound));
}

#[tokio::test]
async fn test_claim_inside_cooldown_reports_next_date() {
    let server = MockServer::start().await;
    let (patient_id, clinic_id, test_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let last_claim = now() - Duration::days(10);

    mount_subscription(
        &server,
        patient_id,
        MockSupabaseResponses::subscription(patient_id, "premium", 50000.0, &iso(now() - Duration::days(90))),
    )
    .await;
    mount_lab_test(&server, test_id, clinic_id, 6000.0).await;
    mount_last_claim(
        &server,
        patient_id,
        json!([MockSupabaseResponses::claim(patient_id, Uuid::new_v4(), 3000.0, &iso(last_claim))]),
    )
    .await;

    let err = service_for(&server)
        .record_claim_at(clinic_id, patient_id, test_id, now())
        .await
        .unwrap_err();

    assert_eq!(err, SubscriptionError::ClaimCooldown(last_claim + Duration::days(30)));
    assert_eq!(err.to_string(), "You can make your next claim on 2026-11-06");
}

struct ChannelNotifier(mpsc::UnboundedSender<ClaimRecordedEvent>);

#[async_trait]
impl ClaimNotifier for ChannelNotifier {
    async fn claim_recorded(&self, event: &ClaimRecordedEvent) -> anyhow::Result<()> {
        self.0.send(event.clone())?;
        Ok(())
    }
}

#[tokio::test]
async fn test_successful_claim_updates_all_three_stores() {
    let server = MockServer::start().await;
    let (patient_id, clinic_id, test_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut row = MockSupabaseResponses::subscription(patient_id, "premium", 20000.0, &iso(now() - Duration::days(90)));
    row["monthly_spending"] = json!([
        { "month": "2026-09", "total_spent": 7000.0 },
        { "month": "2026-10", "total_spent": 2000.0 }
    ]);
    mount_subscription(&server, patient_id, row.clone()).await;
    mount_lab_test(&server, test_id, clinic_id, 6000.0).await;
    mount_last_claim(
        &server,
        patient_id,
        json!([MockSupabaseResponses::claim(patient_id, clinic_id, 2000.0, &iso(now() - Duration::days(45)))]),
    )
    .await;

    let mut saved = row.clone();
    saved["privilege"] = json!(14000.0);
    saved["version"] = json!(2);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/subscriptions"))
        .and(query_param("version", "eq.1"))
        .and(body_partial_json(json!({
            "privilege": 14000.0,
            "monthly_spending": [
                { "month": "2026-09", "total_spent": 7000.0 },
                { "month": "2026-10", "total_spent": 8000.0 }
            ],
            "version": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([saved])))
        .expect(1)
        .mount(&server)
        .await;

    let mut claim_row = MockSupabaseResponses::claim(patient_id, clinic_id, 6000.0, &iso(now()));
    claim_row["claim_no"] = json!(42);
    claim_row["test_id"] = json!(test_id);

    Mock::given(method("POST"))
        .and(path("/rest/v1/claims"))
        .and(body_partial_json(json!({ "cost": 6000.0, "clinic_id": clinic_id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([claim_row])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_clinic_money_owed"))
        .and(body_partial_json(json!({ "p_clinic_id": clinic_id, "p_amount": 6000.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(6000.0)))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = TestConfig::with_url(server.uri()).to_app_config();
    let service = PrivilegeService::with_notifier(
        Arc::new(SupabaseClient::new(&config)),
        PrivilegeRules::from_config(&config),
        Arc::new(ChannelNotifier(tx)),
    );

    let receipt = service
        .record_claim_at(clinic_id, patient_id, test_id, now())
        .await
        .unwrap();

    assert_eq!(receipt.claim_no, Some(42));
    assert_eq!(receipt.remaining_balance, 14000.0);
    assert_eq!(receipt.total_spent_this_month, 8000.0);

    let event = tokio::time::timeout(StdDuration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.claim.claim_no, Some(42));
    assert_eq!(event.remaining_balance, 14000.0);
}

#[tokio::test]
async fn test_ledger_failure_after_save_is_partial_claim() {
    let server = MockServer::start().await;
    let (patient_id, clinic_id, test_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let row = MockSupabaseResponses::subscription(patient_id, "premium", 20000.0, &iso(now() - Duration::days(90)));
    mount_subscription(&server, patient_id, row.clone()).await;
    mount_lab_test(&server, test_id, clinic_id, 6000.0).await;
    mount_last_claim(&server, patient_id, json!([])).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/claims"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::claim(patient_id, clinic_id, 6000.0, &iso(now()))
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_clinic_money_owed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("connection reset"))
        .mount(&server)
        .await;

    let result = service_for(&server)
        .record_claim_at(clinic_id, patient_id, test_id, now())
        .await;

    assert_matches!(result, Err(SubscriptionError::PartialClaim(_)));
}

// ==============================================================================
// ROLLUPS
// ==============================================================================

#[tokio::test]
async fn test_monthly_spend_for_requested_month() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    let mut row = MockSupabaseResponses::subscription(patient_id, "premium", 10000.0, &iso(now() - Duration::days(90)));
    row["monthly_spending"] = json!([{ "month": "2026-09", "total_spent": 4500.0 }]);
    mount_subscription(&server, patient_id, row).await;

    let service = service_for(&server);

    let september = service.monthly_spend(patient_id, Some("2026-09")).await.unwrap();
    assert_eq!(september.total_spent, 4500.0);

    let august = service.monthly_spend(patient_id, Some("2026-08")).await.unwrap();
    assert_eq!(august.month, "2026-08");
    assert_eq!(august.total_spent, 0.0);

    assert_matches!(
        service.monthly_spend(patient_id, Some("sept")).await,
        Err(SubscriptionError::InvalidMonth(_))
    );
}

#[tokio::test]
async fn test_list_claims_newest_first() {
    let server = MockServer::start().await;
    let (patient_id, clinic_id) = (Uuid::new_v4(), Uuid::new_v4());

    mount_last_claim(
        &server,
        patient_id,
        json!([
            MockSupabaseResponses::claim(patient_id, clinic_id, 3000.0, "2026-10-01T10:00:00Z"),
            MockSupabaseResponses::claim(patient_id, clinic_id, 1500.0, "2026-08-20T10:00:00Z")
        ]),
    )
    .await;

    let claims = service_for(&server).list_claims(patient_id).await.unwrap();

    assert_eq!(claims.len(), 2);
    assert!(claims[0].claimed_at > claims[1].claimed_at);
}
