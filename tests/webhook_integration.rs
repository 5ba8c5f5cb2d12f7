//! Integration tests for the webhook HTTP surface.
//!
//! Each test builds the real router over an in-memory store and a recording
//! sender, then drives it with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

use sentiment_responder::channels::MessageSender;
use sentiment_responder::error::DeliveryError;
use sentiment_responder::pipeline::ResponseOrchestrator;
use sentiment_responder::pipeline::policy::{NO_TRANSACTION_POSITIVE, PURCHASED_POSITIVE};
use sentiment_responder::sentiment::LexiconClassifier;
use sentiment_responder::store::{LibSqlResponseStore, ResponseRecord, ResponseStore};
use sentiment_responder::transactions::FixedTransactionStatus;
use sentiment_responder::webhook::{AppState, drain_in_flight, router};

/// Maximum time any test is allowed to wait for background processing.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const VERIFY_TOKEN: &str = "integration-secret";

/// Sender that records instead of calling the platform, optionally after a delay.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    delay: Duration,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }
}

struct Harness {
    app: Router,
    store: Arc<dyn ResponseStore>,
    sender: Arc<RecordingSender>,
    tasks: TaskTracker,
}

async fn harness(recently_completed: bool) -> Harness {
    harness_with_sender(recently_completed, RecordingSender::default()).await
}

async fn harness_with_sender(recently_completed: bool, sender: RecordingSender) -> Harness {
    let store: Arc<dyn ResponseStore> = Arc::new(LibSqlResponseStore::new_memory().await.unwrap());
    let sender = Arc::new(sender);
    let tasks = TaskTracker::new();
    let orchestrator = ResponseOrchestrator::new(
        Arc::new(LexiconClassifier::new()),
        Arc::new(FixedTransactionStatus(recently_completed)),
        sender.clone(),
        Arc::clone(&store),
    );
    let app = router(AppState {
        verify_token: Arc::new(SecretString::from(VERIFY_TOKEN)),
        orchestrator: Arc::new(orchestrator),
        store: Arc::clone(&store),
        tasks: tasks.clone(),
    });
    Harness {
        app,
        store,
        sender,
        tasks,
    }
}

fn message_payload(sender: &str, text: &str) -> Value {
    json!({
        "object": "page",
        "entry": [{
            "id": "PAGE",
            "time": 1_700_000_000_000_i64,
            "messaging": [{
                "sender": {"id": sender},
                "recipient": {"id": "PAGE"},
                "timestamp": 1_700_000_000_000_i64,
                "message": {"mid": "m_1", "text": text}
            }]
        }]
    })
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(app: &Router, body: impl Into<Body>) -> Response {
    app.clone()
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Poll the store until it holds `n` records.
async fn wait_for_records(store: &Arc<dyn ResponseStore>, n: usize) -> Vec<ResponseRecord> {
    timeout(TEST_TIMEOUT, async {
        loop {
            let records: Vec<ResponseRecord> = store.list_all().await.collect().await;
            if records.len() >= n {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for stored responses")
}

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_with_matching_token_echoes_challenge() {
    let h = harness(true).await;
    let response = get(
        &h.app,
        &format!("/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "1158201444");
}

#[tokio::test]
async fn handshake_with_wrong_token_is_forbidden() {
    let h = harness(true).await;
    let response = get(
        &h.app,
        "/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1158201444",
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_string(response).await;
    assert!(!body.contains("1158201444"));
    assert!(!body.contains(VERIFY_TOKEN));
}

#[tokio::test]
async fn handshake_without_token_is_bad_request() {
    let h = harness(true).await;
    let response = get(&h.app, "/webhook?hub.mode=subscribe&hub.challenge=42").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_string(response).await.contains("42"));
}

#[tokio::test]
async fn put_is_method_not_allowed() {
    let h = harness(true).await;
    let response = h
        .app
        .clone()
        .oneshot(Request::put("/webhook").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn head_is_method_not_allowed() {
    let h = harness(true).await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::head(format!(
                "/webhook?hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ── Delivery ────────────────────────────────────────────────────────

#[tokio::test]
async fn positive_message_with_transaction_is_answered_and_stored() {
    let h = harness(true).await;
    let response = post(&h.app, message_payload("U1", "I love this product").to_string()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "EVENT_RECEIVED");

    let records = wait_for_records(&h.store, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sender_id, "U1");
    assert_eq!(records[0].response_text, PURCHASED_POSITIVE);
    assert!(records[0].completed_transaction);
    assert_eq!(h.sender.sent(), vec![("U1".to_string(), PURCHASED_POSITIVE.to_string())]);
}

#[tokio::test]
async fn positive_message_without_transaction_still_stores_true() {
    let h = harness(false).await;
    let response = post(&h.app, message_payload("U1", "I love this product").to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let records = wait_for_records(&h.store, 1).await;
    assert_eq!(records[0].response_text, NO_TRANSACTION_POSITIVE);
    assert!(records[0].completed_transaction);
    assert_eq!(h.sender.sent()[0].1, NO_TRANSACTION_POSITIVE);
}

#[tokio::test]
async fn redelivered_event_is_answered_once() {
    let h = harness(false).await;
    let body = message_payload("U1", "I love this product").to_string();

    assert_eq!(post(&h.app, body.clone()).await.status(), StatusCode::OK);
    assert_eq!(post(&h.app, body).await.status(), StatusCode::OK);
    assert!(drain_in_flight(&h.tasks, TEST_TIMEOUT).await);

    let records: Vec<ResponseRecord> = h.store.list_all().await.collect().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message_id.as_deref(), Some("m_1"));
    assert_eq!(h.sender.sent().len(), 1);
}

#[tokio::test]
async fn shutdown_drain_completes_accepted_work() {
    let slow = RecordingSender {
        delay: Duration::from_millis(200),
        ..Default::default()
    };
    let h = harness_with_sender(true, slow).await;

    let response = post(&h.app, message_payload("U1", "I love this product").to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.store.list_all().await.count().await, 0);

    assert!(drain_in_flight(&h.tasks, TEST_TIMEOUT).await);

    let records: Vec<ResponseRecord> = h.store.list_all().await.collect().await;
    assert_eq!(records.len(), 1);
    assert_eq!(h.sender.sent().len(), 1);
}

#[tokio::test]
async fn empty_entry_list_sends_nothing() {
    let h = harness(true).await;
    let response = post(&h.app, json!({"object": "page", "entry": []}).to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.sender.sent().is_empty());
    assert_eq!(h.store.list_all().await.count().await, 0);
}

#[tokio::test]
async fn empty_text_is_ignored() {
    let h = harness(true).await;
    let response = post(&h.app, message_payload("U1", "").to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.sender.sent().is_empty());
    assert_eq!(h.store.list_all().await.count().await, 0);
}

#[tokio::test]
async fn malformed_json_is_acknowledged() {
    let h = harness(true).await;
    let response = post(&h.app, "{not json").await;

    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn every_entry_and_message_is_processed() {
    let h = harness(true).await;
    let payload = json!({
        "object": "page",
        "entry": [
            {"id": "PAGE", "time": 1, "messaging": [
                {"sender": {"id": "A"}, "recipient": {"id": "PAGE"}, "timestamp": 1, "message": {"mid": "m_a", "text": "great"}},
                {"sender": {"id": "B"}, "recipient": {"id": "PAGE"}, "timestamp": 2, "message": {"mid": "m_b", "text": "awful"}}
            ]},
            {"id": "PAGE", "time": 3, "messaging": [
                {"sender": {"id": "C"}, "recipient": {"id": "PAGE"}, "timestamp": 3, "message": {"mid": "m_c", "text": "fine"}}
            ]}
        ]
    });
    post(&h.app, payload.to_string()).await;

    let records = wait_for_records(&h.store, 3).await;
    let senders: Vec<&str> = records.iter().map(|r| r.sender_id.as_str()).collect();
    assert_eq!(senders, vec!["A", "B", "C"]);
}

// ── Read-only endpoints ─────────────────────────────────────────────

#[tokio::test]
async fn responses_endpoint_lists_stored_records() {
    let h = harness(true).await;
    post(&h.app, message_payload("U1", "I love this product").to_string()).await;
    wait_for_records(&h.store, 1).await;

    let response = get(&h.app, "/api/responses").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["sender_id"], "U1");
    assert_eq!(records[0]["response_text"], PURCHASED_POSITIVE);
    assert_eq!(records[0]["completed_transaction"], true);
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness(true).await;
    let response = get(&h.app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}
