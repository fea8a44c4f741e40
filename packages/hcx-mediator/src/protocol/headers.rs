//! The protocol header set carried as the JWE protected header.
//!
//! Hyphenated names are not map-friendly everywhere, so the set is an
//! explicit record with a fixed serde mapping rather than a string map.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{JWE_ALG, JWE_ENC};
use crate::error::ProtocolError;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProtocolHeaders {
    pub alg: String,
    pub enc: String,
    #[serde(rename = "x-hcx-sender_code")]
    pub sender_code: String,
    #[serde(rename = "x-hcx-recipient_code")]
    pub recipient_code: String,
    /// ISO-8601 with offset, seconds precision
    #[serde(rename = "x-hcx-timestamp")]
    pub timestamp: String,
    #[serde(rename = "x-hcx-correlation_id")]
    pub correlation_id: String,
    /// Fresh per call
    #[serde(rename = "x-hcx-api_call_id")]
    pub api_call_id: String,
    #[serde(
        rename = "x-hcx-workflow_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub workflow_id: Option<String>,
    #[serde(
        rename = "x-hcx-status",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
}

impl ProtocolHeaders {
    ///
    /// Build the header set for one outbound call. The recipient code is
    /// mandatory — omitting it is a programmer error and fails before any
    /// network I/O. A supplied correlation id is propagated verbatim
    /// (response legs); otherwise a fresh one is minted.
    ///
    pub fn build(
        sender_code: &str,
        recipient_code: &str,
        correlation_id: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        if recipient_code.is_empty() {
            return Err(ProtocolError::MissingRecipient);
        }

        Ok(ProtocolHeaders {
            alg: JWE_ALG.to_string(),
            enc: JWE_ENC.to_string(),
            sender_code: sender_code.to_string(),
            recipient_code: recipient_code.to_string(),
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            correlation_id: correlation_id
                .map(String::from)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            api_call_id: Uuid::new_v4().to_string(),
            workflow_id: None,
            status: None,
        })
    }

    pub fn with_workflow_id(mut self, workflow_id: &str) -> Self {
        self.workflow_id = Some(workflow_id.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn api_call_id_is_fresh_per_call() {
        let a = ProtocolHeaders::build("1-sender", "1-recipient", None).unwrap();
        let b = ProtocolHeaders::build("1-sender", "1-recipient", None).unwrap();

        assert_ne!(a.api_call_id, b.api_call_id);
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn correlation_id_is_propagated_verbatim() {
        let headers = ProtocolHeaders::build("1-sender", "1-recipient", Some("corr-X")).unwrap();
        assert_eq!(headers.correlation_id, "corr-X");
    }

    #[test]
    fn timestamp_is_iso8601_with_offset() {
        let headers = ProtocolHeaders::build("1-sender", "1-recipient", None).unwrap();

        let re = Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$").unwrap();
        assert!(
            re.is_match(&headers.timestamp),
            "timestamp: {}",
            headers.timestamp
        );
    }

    #[test]
    fn missing_recipient_fails_before_io() {
        let err = ProtocolHeaders::build("1-sender", "", None).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingRecipient));
    }

    #[test]
    fn headers_serialize_with_hyphenated_names() {
        let headers = ProtocolHeaders::build("1-sender", "1-recipient", Some("corr-X")).unwrap();
        let value = serde_json::to_value(&headers).unwrap();

        assert_eq!(value["alg"], "RSA-OAEP");
        assert_eq!(value["enc"], "A256GCM");
        assert_eq!(value["x-hcx-sender_code"], "1-sender");
        assert_eq!(value["x-hcx-recipient_code"], "1-recipient");
        assert_eq!(value["x-hcx-correlation_id"], "corr-X");
        assert!(value.get("x-hcx-workflow_id").is_none());
        assert!(value.get("x-hcx-status").is_none());
    }
}
