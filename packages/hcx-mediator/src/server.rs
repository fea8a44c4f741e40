//! HTTP surface: the public callback endpoints plus the internal RPC the
//! surrounding application calls. The acting username arrives in the
//! `x-actor` header, stamped by the application's session layer.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::catalogs;
use crate::error::{CryptoError, Error, ProtocolError, RegistryError};
use crate::listener;
use crate::mediator::Mediator;

pub fn router(mediator: Arc<Mediator>) -> Router {
    Router::new()
        .merge(listener::routes())
        .route("/hcx/check_eligibility", post(check_eligibility))
        .route("/hcx/make_claim", post(make_claim))
        .route("/hcx/send_communication", post(send_communication))
        .route("/hcx/payors", get(payors))
        .route("/hcx/packages", get(packages))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(mediator)
}

pub async fn serve(
    mediator: Arc<Mediator>,
    listener: tokio::net::TcpListener,
) -> std::io::Result<()> {
    axum::serve(listener, router(mediator))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler installs");
    let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler installs");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn actor(headers: &HeaderMap) -> &str {
    headers
        .get("x-actor")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("system")
}

#[derive(Deserialize)]
struct CheckEligibilityBody {
    policy: Uuid,
}

async fn check_eligibility(
    State(mediator): State<Arc<Mediator>>,
    headers: HeaderMap,
    Json(body): Json<CheckEligibilityBody>,
) -> Response {
    ack_response(
        mediator
            .check_eligibility(&body.policy.to_string(), actor(&headers))
            .await,
    )
}

#[derive(Deserialize)]
struct MakeClaimBody {
    claim: Uuid,
}

async fn make_claim(
    State(mediator): State<Arc<Mediator>>,
    headers: HeaderMap,
    Json(body): Json<MakeClaimBody>,
) -> Response {
    ack_response(
        mediator
            .make_claim(&body.claim.to_string(), actor(&headers))
            .await,
    )
}

#[derive(Deserialize)]
struct SendCommunicationBody {
    communication: Uuid,
}

async fn send_communication(
    State(mediator): State<Arc<Mediator>>,
    headers: HeaderMap,
    Json(body): Json<SendCommunicationBody>,
) -> Response {
    ack_response(
        mediator
            .send_communication(&body.communication.to_string(), actor(&headers))
            .await,
    )
}

#[derive(Deserialize)]
struct PayorQuery {
    query: Option<String>,
}

async fn payors(
    State(mediator): State<Arc<Mediator>>,
    Query(params): Query<PayorQuery>,
) -> Response {
    match catalogs::list_payors(&mediator.registry, params.query.as_deref()).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct PackageQuery {
    query: Option<String>,
    limit: Option<usize>,
}

async fn packages(
    State(mediator): State<Arc<Mediator>>,
    Query(params): Query<PackageQuery>,
) -> Response {
    let entries = mediator.packages.search(params.query.as_deref(), params.limit);
    (StatusCode::OK, Json(entries)).into_response()
}

fn ack_response(result: Result<Value, Error>) -> Response {
    match result {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Auth(_) => StatusCode::BAD_GATEWAY,
        Error::Registry(RegistryError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Registry(_) => StatusCode::BAD_GATEWAY,
        Error::Crypto(CryptoError::Encrypt | CryptoError::InvalidKey) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Error::Crypto(_) => StatusCode::BAD_REQUEST,
        Error::Protocol(ProtocolError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        Error::Protocol(ProtocolError::MissingRecipient) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Protocol(_) => StatusCode::BAD_GATEWAY,
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::EntityNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match &err {
        Error::Validation { issues } => json!({
            "error": err.to_string(),
            "issues": issues,
        }),
        _ => json!({ "error": err.to_string() }),
    };

    (status, Json(body)).into_response()
}
