//! Outbound dispatch: resolve the recipient's key, seal the bundle,
//! deliver to the gateway.
//!
//! One invocation is one send attempt; nothing is retried here and no
//! entity is mutated on failure — the asynchronous callback is the
//! authoritative state change, so a lost ack is safe.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, info};

use super::{Operation, ProtocolHeaders};
use crate::crypto;
use crate::error::{Error, ProtocolError};
use crate::fhir::types::Bundle;
use crate::log::PROTOCOL;
use crate::registry::RegistryClient;

/// Per-action deadline across all round-trips of one send.
const ACTION_DEADLINE: Duration = Duration::from_secs(30);

/// What went over the wire and what the gateway said to it.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub token: String,
    pub ack: Value,
}

#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    registry: Arc<RegistryClient>,
    protocol_base: String,
    participant_code: String,
}

impl Dispatcher {
    pub fn new(
        http: reqwest::Client,
        registry: Arc<RegistryClient>,
        protocol_base: &str,
        participant_code: &str,
    ) -> Self {
        Dispatcher {
            http,
            registry,
            protocol_base: protocol_base.trim_end_matches('/').to_string(),
            participant_code: participant_code.to_string(),
        }
    }

    ///
    /// Encrypt `bundle` for `recipient_code` and POST it to the gateway
    /// operation endpoint. The supplied correlation id is passed through
    /// on response legs; request legs mint a fresh one.
    ///
    pub async fn send(
        &self,
        bundle: &Bundle,
        operation: Operation,
        recipient_code: &str,
        correlation_id: Option<&str>,
    ) -> Result<Dispatch, Error> {
        timeout(
            ACTION_DEADLINE,
            self.send_inner(bundle, operation, recipient_code, correlation_id),
        )
        .await?
    }

    async fn send_inner(
        &self,
        bundle: &Bundle,
        operation: Operation,
        recipient_code: &str,
        correlation_id: Option<&str>,
    ) -> Result<Dispatch, Error> {
        let headers =
            ProtocolHeaders::build(&self.participant_code, recipient_code, correlation_id)?;

        let cert = self.registry.fetch_public_cert(recipient_code).await?;

        let payload = serde_json::to_value(bundle)?;
        let protected = serde_json::to_value(&headers)?;
        let token = crypto::encrypt(&cert, &payload, &protected)?;

        debug!(
            target: PROTOCOL,
            msg = "Token sealed",
            operation = operation.path(),
            recipient = recipient_code,
            api_call_id = headers.api_call_id,
        );

        let bearer = self.registry.token().await?;
        let url = format!("{}/{}", self.protocol_base, operation.path());

        let response = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&json!({ "payload": token }))
            .send()
            .await
            .map_err(|err| Error::Protocol(ProtocolError::Transport(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProtocolError::Gateway {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let ack: Value = response
            .json()
            .await
            .map_err(|err| Error::Protocol(ProtocolError::Transport(err)))?;

        info!(
            target: PROTOCOL,
            msg = "Dispatched",
            operation = operation.path(),
            recipient = recipient_code,
            correlation_id = headers.correlation_id,
        );

        Ok(Dispatch { token, ack })
    }
}
