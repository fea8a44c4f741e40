//! Inbound receiver: the four callback endpoints the gateway delivers
//! asynchronous responses to.
//!
//! Authenticity is established by decryption alone — a token that does
//! not decrypt with our private key is dropped with a 400. A payload
//! whose correlating entity is unknown still gets a 202 so the gateway
//! does not loop on redelivery; only a persistence failure withholds the
//! 202. Handlers overwrite outcomes unconditionally, so replaying a
//! callback is safe and the later write wins.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::crypto;
use crate::error::Error;
use crate::fhir::{parse, Outcome};
use crate::log::{LISTENER, NOTIFY};
use crate::mediator::Mediator;
use crate::store::{NewCommunication, PushEvent};

// Route tags are matched verbatim by the UI's pending-state indicators;
// do not edit them.
const ELIGIBILITY_ON_CHECK_TAG: &str = "coverageelegibility/on_check";
const PREAUTH_ON_SUBMIT_TAG: &str = "preauth/on_submit";
const CLAIM_ON_SUBMIT_TAG: &str = "claim/on_submit";
const COMMUNICATION_REQUEST_TAG: &str = "communication/request";

#[derive(Deserialize)]
pub struct CallbackBody {
    pub payload: String,
}

pub fn routes() -> Router<Arc<Mediator>> {
    Router::new()
        .route("/coverageeligibility/on_check", post(eligibility_on_check))
        .route("/preauth/on_submit", post(preauth_on_submit))
        .route("/claim/on_submit", post(claim_on_submit))
        .route("/communication/request", post(communication_request))
}

async fn eligibility_on_check(
    State(mediator): State<Arc<Mediator>>,
    Json(body): Json<CallbackBody>,
) -> Response {
    respond(mediator.handle_eligibility_on_check(&body.payload).await)
}

async fn preauth_on_submit(
    State(mediator): State<Arc<Mediator>>,
    Json(body): Json<CallbackBody>,
) -> Response {
    respond(
        mediator
            .handle_claim_on_submit(&body.payload, PREAUTH_ON_SUBMIT_TAG)
            .await,
    )
}

async fn claim_on_submit(
    State(mediator): State<Arc<Mediator>>,
    Json(body): Json<CallbackBody>,
) -> Response {
    respond(
        mediator
            .handle_claim_on_submit(&body.payload, CLAIM_ON_SUBMIT_TAG)
            .await,
    )
}

async fn communication_request(
    State(mediator): State<Arc<Mediator>>,
    Json(body): Json<CallbackBody>,
) -> Response {
    respond(mediator.handle_communication_request(&body.payload).await)
}

fn respond(result: Result<(), Error>) -> Response {
    match result {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({}))).into_response(),
        Err(Error::Crypto(err)) => {
            warn!(target: LISTENER, msg = "Token rejected", error = err.to_string());
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(Error::Fhir(err)) => {
            warn!(target: LISTENER, msg = "Payload rejected", error = err.to_string());
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            warn!(target: LISTENER, msg = "Callback failed", error = err.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

impl Mediator {
    async fn push(&self, username: Option<&str>, event: PushEvent) {
        let Some(username) = username else {
            return;
        };
        // Delivery is best-effort; the 202 to the gateway does not depend on it
        if let Err(err) = self.notifications.notify(username, event).await {
            warn!(
                target: NOTIFY,
                msg = "Push delivery failed",
                username,
                error = err.to_string()
            );
        }
    }

    pub async fn handle_eligibility_on_check(&self, token: &str) -> Result<(), Error> {
        let envelope = crypto::decrypt(self.private_key_pem(), token)?;
        let update = parse::eligibility_response(&envelope.payload)?;

        let policy = match self.store.policy(&update.id).await {
            Ok(policy) => policy,
            Err(Error::EntityNotFound { kind, id }) => {
                warn!(target: LISTENER, msg = "Unknown policy in on_check", kind, id);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.store
            .set_policy_outcome(&update.id, update.outcome, &update.error)
            .await?;

        info!(
            target: LISTENER,
            msg = "Eligibility outcome",
            policy = update.id,
            outcome = update.outcome.as_str(),
        );

        let message = if update.outcome == Outcome::Error {
            "failed"
        } else {
            "success"
        };
        self.push(
            policy.last_modified_by.as_deref(),
            PushEvent::message(ELIGIBILITY_ON_CHECK_TAG, message),
        )
        .await;

        Ok(())
    }

    pub async fn handle_claim_on_submit(&self, token: &str, from: &str) -> Result<(), Error> {
        let envelope = crypto::decrypt(self.private_key_pem(), token)?;
        let update = parse::claim_response(&envelope.payload)?;

        let claim = match self.store.claim(&update.id).await {
            Ok(claim) => claim,
            Err(Error::EntityNotFound { kind, id }) => {
                warn!(target: LISTENER, msg = "Unknown claim in on_submit", kind, id);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.store
            .set_claim_outcome(&update.id, update.outcome, update.total_approved, &update.error)
            .await?;

        info!(
            target: LISTENER,
            msg = "Claim outcome",
            claim = update.id,
            outcome = update.outcome.as_str(),
            total_approved = update.total_approved,
        );

        let message = if update.outcome == Outcome::Error {
            "failed"
        } else {
            "success"
        };
        self.push(
            claim.last_modified_by.as_deref(),
            PushEvent::message(from, message),
        )
        .await;

        Ok(())
    }

    pub async fn handle_communication_request(&self, token: &str) -> Result<(), Error> {
        let envelope = crypto::decrypt(self.private_key_pem(), token)?;
        let inbound = parse::communication_request(&envelope.payload)?;

        // `about` may reference several claims; the most recently
        // referenced one owns the conversation
        let mut claim = None;
        for claim_id in &inbound.about {
            if let Ok(found) = self.store.claim(claim_id).await {
                claim = Some(found);
            }
        }
        let Some(claim) = claim else {
            warn!(
                target: LISTENER,
                msg = "Communication request references no known claim",
                identifier = inbound.identifier,
            );
            return Ok(());
        };

        let record = self
            .store
            .create_communication(NewCommunication {
                identifier: inbound.identifier.clone(),
                claim_id: claim.external_id.clone(),
                content: inbound.payload,
            })
            .await?;

        info!(
            target: LISTENER,
            msg = "Communication received",
            identifier = inbound.identifier,
            claim = claim.external_id,
            communication = record.external_id,
        );

        self.push(
            claim.last_modified_by.as_deref(),
            PushEvent::message(COMMUNICATION_REQUEST_TAG, &record.external_id),
        )
        .await;

        Ok(())
    }
}
