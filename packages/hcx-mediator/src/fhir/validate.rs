//! Remote `$validate` gate for outbound bundles.
//!
//! Only the communication leg validates before dispatch; the eligibility
//! and claim legs send as built, since the gateway's FHIR dialect is not
//! guaranteed to match the validator's.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, ProtocolError};
use crate::log::FHIR;

pub async fn validate_remote(
    http: &reqwest::Client,
    ig_url: &str,
    bundle: &Value,
) -> Result<(), Error> {
    let url = format!("{}/Bundle/$validate", ig_url.trim_end_matches('/'));

    let response = http
        .post(&url)
        .json(bundle)
        .send()
        .await
        .map_err(|err| Error::Protocol(ProtocolError::Transport(err)))?;

    let body: Value = response
        .json()
        .await
        .map_err(|err| Error::Protocol(ProtocolError::Transport(err)))?;

    let issues = body
        .get("issue")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    debug!(target: FHIR, msg = "Validator response", issues = issues.len());

    let rejected = issues
        .iter()
        .any(|issue| issue.get("severity").and_then(Value::as_str) == Some("error"));

    if rejected {
        return Err(Error::Validation { issues });
    }

    Ok(())
}
