//! Shared fixtures: an in-process stub gateway, a mediator wired to it
//! over the in-memory store, and entity seed helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use hcx_mediator::config::{GatewayConfig, LogConfig, MediatorConfig, ServerConfig};
use hcx_mediator::fhir::builder::{ClaimLineItem, ContentItem};
use hcx_mediator::fhir::{ClaimType, ClaimUse, Gender, Priority, Purpose, Status};
use hcx_mediator::store::memory::MemoryStore;
use hcx_mediator::store::{
    ClaimRecord, ConsultationRecord, FacilityRecord, PatientRecord, PolicyRecord,
};
use hcx_mediator::{crypto, Mediator};

pub const LOCAL_PRIVATE: &str = include_str!("../keys/local_private.pem");
pub const LOCAL_CERT: &str = include_str!("../keys/local_cert.pem");
pub const PAYOR_PRIVATE: &str = include_str!("../keys/payor_private.pem");
pub const PAYOR_CERT: &str = include_str!("../keys/payor_cert.pem");

/// Participant code the stub registry answers for.
pub const PAYOR_CODE: &str = "1-test-payor";
pub const PROVIDER_CODE: &str = "1-test-provider";

struct StubState {
    base: String,
    auth_calls: AtomicUsize,
    operations: Mutex<Vec<(String, String)>>,
}

/// The gateway's side of the conversation, observable from tests.
pub struct StubGateway {
    pub base: String,
    state: Arc<StubState>,
}

impl StubGateway {
    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    /// Captured `(operation path, jwe token)` pairs, oldest first.
    pub fn operations(&self) -> Vec<(String, String)> {
        self.state.operations.lock().unwrap().clone()
    }
}

async fn auth(State(state): State<Arc<StubState>>) -> Json<Value> {
    let n = state.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "access_token": format!("bearer-{n}"), "expires_in": 3600 }))
}

async fn participant_search(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let filters = &body["filters"];

    if let Some(code) = filters["participant_code"]["eq"].as_str() {
        if code == PAYOR_CODE || code == "GICOFINDIA" {
            return Json(json!({
                "participants": [{
                    "participant_code": code,
                    "participant_name": "Test Payor",
                    "status": "Active",
                    "primary_email": "claims@payor.test",
                    "encryption_cert": format!("{}/certs/payor.pem", state.base),
                }]
            }));
        }
        return Json(json!({ "participants": [] }));
    }

    if filters["roles"]["eq"].as_str() == Some("payor") {
        return Json(json!({
            "participants": [
                {"participant_code": "1-alpha", "participant_name": "Alpha Assurance", "status": "Active"},
                {"participant_code": "1-beta", "participant_name": "Beta Mutual", "status": "Inactive"}
            ]
        }));
    }

    Json(json!({ "participants": [] }))
}

async fn payor_cert() -> &'static str {
    PAYOR_CERT
}

async fn local_private_key() -> &'static str {
    LOCAL_PRIVATE
}

async fn validate() -> Json<Value> {
    Json(json!({ "resourceType": "OperationOutcome", "issue": [] }))
}

async fn operation(
    State(state): State<Arc<StubState>>,
    Path(operation): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let token = body["payload"].as_str().unwrap_or_default().to_string();
    state.operations.lock().unwrap().push((operation, token));
    Json(json!({ "status": "accepted" }))
}

///
/// Bind the stub gateway on an ephemeral port and serve it for the rest
/// of the test.
///
pub async fn stub_gateway() -> StubGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let state = Arc::new(StubState {
        base: base.clone(),
        auth_calls: AtomicUsize::new(0),
        operations: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/auth/token", post(auth))
        .route("/api/v0.7/participant/search", post(participant_search))
        .route("/api/v0.7/{*operation}", post(operation))
        .route("/certs/payor.pem", get(payor_cert))
        .route("/keys/private.pem", get(local_private_key))
        .route("/hapi-fhir/fhir/Bundle/$validate", post(validate))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubGateway { base, state }
}

pub struct TestHarness {
    pub mediator: Arc<Mediator>,
    pub store: Arc<MemoryStore>,
    pub gateway: StubGateway,
}

pub async fn harness() -> TestHarness {
    let gateway = stub_gateway().await;

    let config = MediatorConfig {
        server: ServerConfig::default(),
        gateway: GatewayConfig {
            protocol_base: format!("{}/api/v0.7", gateway.base),
            auth_base: format!("{}/auth/token", gateway.base),
            participant_code: PROVIDER_CODE.to_string(),
            username: "provider@test.example".to_string(),
            password: "not-a-real-password".to_string(),
            encryption_private_key_url: format!("{}/keys/private.pem", gateway.base),
            ig_url: format!("{}/hapi-fhir/fhir", gateway.base),
        },
        log: LogConfig::default(),
    };

    let store = Arc::new(MemoryStore::new());
    let mediator = Mediator::init(config, store.clone(), store.clone(), store.clone())
        .await
        .unwrap();

    TestHarness {
        mediator: Arc::new(mediator),
        store,
        gateway,
    }
}

/// Seal a payload the way the gateway would: encrypted to our cert,
/// protocol headers protected.
pub fn inbound_token(payload: &Value, correlation_id: &str) -> String {
    let headers = json!({
        "alg": "RSA-OAEP",
        "enc": "A256GCM",
        "x-hcx-sender_code": PAYOR_CODE,
        "x-hcx-recipient_code": PROVIDER_CODE,
        "x-hcx-correlation_id": correlation_id,
        "x-hcx-api_call_id": uuid(),
        "x-hcx-timestamp": Utc::now().to_rfc3339(),
    });
    crypto::encrypt(LOCAL_CERT, payload, &headers).unwrap()
}

pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Enable log output for a test run.
pub fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();
}

pub fn policy(external_id: &str) -> PolicyRecord {
    PolicyRecord {
        external_id: external_id.to_string(),
        patient: PatientRecord {
            external_id: format!("patient-{external_id}"),
            name: "Ravi Kumar".to_string(),
            gender: Gender::Male,
            facility: FacilityRecord {
                external_id: "facility-1".to_string(),
                name: "General Hospital".to_string(),
                facility_id: "IN0001".to_string(),
            },
        },
        subscriber_id: "SUB-1".to_string(),
        policy_id: "POL-1".to_string(),
        insurer_code: PAYOR_CODE.to_string(),
        insurer_name: "Test Payor".to_string(),
        status: Status::Active,
        priority: Priority::Normal,
        purpose: Purpose::Benefits,
        outcome: None,
        error_text: None,
        created_by: Some("doctor".to_string()),
        last_modified_by: Some("doctor".to_string()),
    }
}

pub fn claim(
    external_id: &str,
    consultation_id: &str,
    policy: PolicyRecord,
    use_: ClaimUse,
    items: Vec<ClaimLineItem>,
) -> ClaimRecord {
    let total = items.iter().map(|item| item.price).sum();
    ClaimRecord {
        external_id: external_id.to_string(),
        consultation_id: consultation_id.to_string(),
        policy,
        items,
        total_claim_amount: total,
        total_amount_approved: None,
        use_,
        status: Status::Active,
        priority: Priority::Normal,
        claim_type: ClaimType::Institutional,
        outcome: None,
        error_text: None,
        created_by: Some("doctor".to_string()),
        last_modified_by: Some("doctor".to_string()),
        modified_at: Utc::now(),
    }
}

pub fn line_item(id: &str, name: &str, price: f64) -> ClaimLineItem {
    ClaimLineItem {
        id: id.to_string(),
        name: name.to_string(),
        price,
        category: None,
    }
}

pub fn consultation(external_id: &str, patient_id: &str) -> ConsultationRecord {
    ConsultationRecord {
        external_id: external_id.to_string(),
        patient_id: patient_id.to_string(),
        procedures: Vec::new(),
        diagnoses: Vec::new(),
    }
}

pub fn text_item(data: &str) -> ContentItem {
    ContentItem {
        kind: "text".to_string(),
        name: None,
        data: data.to_string(),
    }
}
