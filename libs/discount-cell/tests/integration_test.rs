use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use discount_cell::{
    CartDiscountSnapshot, CreateDiscountRequest, DiscountCreatedEvent, DiscountError,
    DiscountEventPublisher, DiscountLedger,
};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const FAR_FUTURE: &str = "2026-12-31T23:59:59Z";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn ledger_for(server: &MockServer) -> DiscountLedger {
    let config = TestConfig::with_url(server.uri()).to_app_config();
    DiscountLedger::with_client(Arc::new(SupabaseClient::new(&config)))
}

async fn mount_sweep(server: &MockServer, clinic_id: Uuid, flipped: serde_json::Value) {
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/discounts"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .and(query_param("status", "eq.0"))
        .and(body_json(json!({ "status": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(flipped))
        .mount(server)
        .await;
}

async fn mount_active_count(server: &MockServer, clinic_id: Uuid, ids: usize) {
    let rows: Vec<_> = (0..ids).map(|_| json!({ "id": Uuid::new_v4() })).collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/discounts"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mount_valid_lookup(server: &MockServer, code: &str, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/discounts"))
        .and(query_param("code", format!("eq.{}", code)))
        .and(query_param("status", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_apply_save10_to_1000() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    mount_sweep(&server, clinic_id, json!([])).await;
    mount_active_count(&server, clinic_id, 1).await;
    mount_valid_lookup(
        &server,
        "SAVE10",
        json!([MockSupabaseResponses::discount(clinic_id, "SAVE10", 10, FAR_FUTURE, 0)]),
    )
    .await;

    let applied = ledger_for(&server)
        .apply_at(clinic_id, "save10", 1000.0, now())
        .await
        .unwrap();

    assert_eq!(applied.code, "SAVE10");
    assert_eq!(applied.percentage, 10);
    assert_eq!(applied.discount_amount, 100.0);
    assert_eq!(applied.final_price, 900.0);
}

#[tokio::test]
async fn test_expired_code_is_invalid_after_sweep() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    // The sweep flips OLD5; another code keeps the clinic's active count above zero.
    mount_sweep(
        &server,
        clinic_id,
        json!([MockSupabaseResponses::discount(clinic_id, "OLD5", 5, "2026-10-01T00:00:00Z", 1)]),
    )
    .await;
    mount_active_count(&server, clinic_id, 1).await;
    mount_valid_lookup(&server, "OLD5", json!([])).await;

    let result = ledger_for(&server).apply_at(clinic_id, "OLD5", 1000.0, now()).await;

    assert_matches!(result, Err(DiscountError::InvalidCode));
    assert_eq!(DiscountError::InvalidCode.to_string(), "Invalid discount code");
}

#[tokio::test]
async fn test_apply_without_any_active_discount_is_business_rule() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    mount_sweep(&server, clinic_id, json!([])).await;
    mount_active_count(&server, clinic_id, 0).await;

    let result = ledger_for(&server).apply_at(clinic_id, "SAVE10", 1000.0, now()).await;
    assert_matches!(result, Err(DiscountError::NoActiveDiscounts));
}

#[tokio::test]
async fn test_create_rejects_existing_code() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/discounts"))
        .and(query_param("code", "eq.WELCOME"))
        .and(query_param("is_deleted", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::discount(clinic_id, "WELCOME", 15, FAR_FUTURE, 0)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/discounts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = ledger_for(&server)
        .create(
            clinic_id,
            CreateDiscountRequest {
                code: " welcome ".to_string(),
                percentage: 15,
                valid_until: Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
                is_hidden: false,
            },
        )
        .await;

    assert_matches!(result, Err(DiscountError::DuplicateCode(code)) if code == "WELCOME");
}

#[tokio::test]
async fn test_create_maps_unique_violation_to_duplicate() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/discounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/discounts"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value", "23505"),
        ))
        .mount(&server)
        .await;

    let result = ledger_for(&server)
        .create(
            clinic_id,
            CreateDiscountRequest {
                code: "RACE".to_string(),
                percentage: 20,
                valid_until: Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
                is_hidden: true,
            },
        )
        .await;

    assert_matches!(result, Err(DiscountError::DuplicateCode(_)));
}

#[tokio::test]
async fn test_create_rejects_out_of_range_percentage() {
    let server = MockServer::start().await;

    for percentage in [0, 101, -5] {
        let result = ledger_for(&server)
            .create(
                Uuid::new_v4(),
                CreateDiscountRequest {
                    code: "BAD".to_string(),
                    percentage,
                    valid_until: Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
                    is_hidden: false,
                },
            )
            .await;
        assert_matches!(result, Err(DiscountError::ValidationError(_)));
    }
}

struct ChannelPublisher(mpsc::UnboundedSender<DiscountCreatedEvent>);

#[async_trait]
impl DiscountEventPublisher for ChannelPublisher {
    async fn discount_created(&self, event: &DiscountCreatedEvent) -> anyhow::Result<()> {
        self.0.send(event.clone())?;
        Ok(())
    }
}

#[tokio::test]
async fn test_visible_discount_is_published_and_hidden_is_not() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/discounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut hidden_row = MockSupabaseResponses::discount(clinic_id, "QUIET", 5, FAR_FUTURE, 0);
    hidden_row["is_hidden"] = json!(true);

    Mock::given(method("POST"))
        .and(path("/rest/v1/discounts"))
        .and(wiremock::matchers::body_partial_json(json!({ "code": "LOUD" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::discount(clinic_id, "LOUD", 25, FAR_FUTURE, 0)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/discounts"))
        .and(wiremock::matchers::body_partial_json(json!({ "code": "QUIET" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([hidden_row])))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = TestConfig::with_url(server.uri()).to_app_config();
    let ledger = DiscountLedger::with_publisher(
        Arc::new(SupabaseClient::new(&config)),
        Arc::new(ChannelPublisher(tx)),
    );
    let valid_until = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap();

    ledger
        .create(
            clinic_id,
            CreateDiscountRequest { code: "quiet".to_string(), percentage: 5, valid_until, is_hidden: true },
        )
        .await
        .unwrap();
    ledger
        .create(
            clinic_id,
            CreateDiscountRequest { code: "loud".to_string(), percentage: 25, valid_until, is_hidden: false },
        )
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.clinic_id, clinic_id);
    assert_eq!(event.discount.code, "LOUD");

    let nothing_else = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(nothing_else.is_err());
}

#[tokio::test]
async fn test_revalidate_is_idempotent() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    mount_sweep(&server, clinic_id, json!([])).await;
    mount_valid_lookup(
        &server,
        "SAVE10",
        json!([MockSupabaseResponses::discount(clinic_id, "SAVE10", 10, FAR_FUTURE, 0)]),
    )
    .await;

    let ledger = ledger_for(&server);
    let snapshot = CartDiscountSnapshot {
        code: Some("SAVE10".to_string()),
        ..CartDiscountSnapshot::full_price(2500.0)
    };

    let first = ledger.revalidate_at(clinic_id, 2500.0, &snapshot, now()).await.unwrap();
    let second = ledger.revalidate_at(clinic_id, 2500.0, &first, now()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.final_price, 2250.0);
    assert_eq!(first.percentage, Some(10));
}

#[tokio::test]
async fn test_revalidate_resets_invalid_code_silently() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    mount_sweep(&server, clinic_id, json!([])).await;
    mount_valid_lookup(&server, "GONE", json!([])).await;

    let stale = CartDiscountSnapshot {
        code: Some("GONE".to_string()),
        percentage: Some(30),
        discount_amount: 300.0,
        final_price: 700.0,
        expires_at: Some(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()),
    };

    let refreshed = ledger_for(&server)
        .revalidate_at(clinic_id, 1000.0, &stale, now())
        .await
        .unwrap();

    assert_eq!(refreshed, CartDiscountSnapshot::full_price(1000.0));
}

#[tokio::test]
async fn test_delete_missing_discount_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/discounts"))
        .and(body_json(json!({ "is_deleted": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = ledger_for(&server).delete(Uuid::new_v4(), Uuid::new_v4()).await;
    assert_matches!(result, Err(DiscountError::NotFound));
}

#[tokio::test]
async fn test_validate_returns_usable_code_and_rejects_expired_one() {
    let server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    mount_sweep(&server, clinic_id, json!([])).await;
    mount_valid_lookup(
        &server,
        "SAVE10",
        json!([MockSupabaseResponses::discount(clinic_id, "SAVE10", 10, "2099-12-31T23:59:59Z", 0)]),
    )
    .await;
    // A stale row that slipped past the store filter is still refused.
    mount_valid_lookup(
        &server,
        "OLD5",
        json!([MockSupabaseResponses::discount(clinic_id, "OLD5", 5, "2026-10-01T00:00:00Z", 1)]),
    )
    .await;

    let ledger = ledger_for(&server);

    let discount = ledger.validate(clinic_id, " save10 ").await.unwrap();
    assert_eq!(discount.code, "SAVE10");
    assert_eq!(discount.percentage, 10);

    assert_matches!(
        ledger.validate(clinic_id, "OLD5").await,
        Err(DiscountError::InvalidCode)
    );
}
