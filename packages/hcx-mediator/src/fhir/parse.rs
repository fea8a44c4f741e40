//! Extraction of correlation ids and outcomes from inbound response
//! payloads.
//!
//! Inbound bundles arrive as raw JSON; each helper digs out the one
//! resource it cares about and leaves the rest untouched, so unknown
//! resource types never fail a callback.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::builder::{ContentItem, CONTENT_TEXT, CONTENT_URL};
use super::codes::Outcome;
use super::types::{ClaimResponse, CommunicationRequest, CoverageEligibilityResponse, ResponseError};
use crate::error::FhirError;

/// Outcome of a coverage-eligibility check, correlated by policy external id.
#[derive(Clone, Debug)]
pub struct EligibilityUpdate {
    pub id: String,
    pub outcome: Outcome,
    pub error: String,
}

/// Outcome of a preauth/claim submission, correlated by claim external id.
#[derive(Clone, Debug)]
pub struct ClaimUpdate {
    pub id: String,
    pub outcome: Outcome,
    pub total_approved: f64,
    pub error: String,
}

/// A payor-initiated communication request.
#[derive(Clone, Debug)]
pub struct InboundCommunication {
    pub identifier: String,
    pub about: Vec<String>,
    pub payload: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ResourceId {
    #[serde(default)]
    id: Option<String>,
}

fn entries(bundle: &Value) -> impl Iterator<Item = &Value> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource"))
}

/// Find and deserialize the first resource of `resource_type` in a bundle.
pub fn first_resource<T: DeserializeOwned>(
    bundle: &Value,
    resource_type: &'static str,
) -> Result<T, FhirError> {
    let resource = entries(bundle)
        .find(|resource| resource["resourceType"] == resource_type)
        .ok_or(FhirError::MissingResource { resource_type })?;
    serde_json::from_value(resource.clone()).map_err(FhirError::Deserialize)
}

fn join_errors(errors: &[ResponseError]) -> String {
    errors
        .iter()
        .map(|error| {
            error
                .code
                .coding
                .iter()
                .map(|coding| {
                    match (coding.code.as_deref(), coding.display.as_deref()) {
                        (Some(code), Some(display)) => format!("{code}: {display}"),
                        (Some(code), None) => code.to_string(),
                        (None, Some(display)) => display.to_string(),
                        (None, None) => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_outcome(value: Option<String>, resource_type: &'static str) -> Result<Outcome, FhirError> {
    let code = value.ok_or(FhirError::MissingField {
        resource_type,
        field: "outcome",
    })?;
    Outcome::parse(&code).ok_or(FhirError::UnknownOutcome { value: code })
}

///
/// A CoverageEligibilityResponse bundle. The correlating id is read from
/// the echoed Coverage entry, falling back to the bundle id — the request
/// bundle stamps the policy external id on both.
///
pub fn eligibility_response(payload: &Value) -> Result<EligibilityUpdate, FhirError> {
    let response: CoverageEligibilityResponse =
        first_resource(payload, "CoverageEligibilityResponse")?;

    let id = first_resource::<ResourceId>(payload, "Coverage")
        .ok()
        .and_then(|coverage| coverage.id)
        .or_else(|| payload.get("id").and_then(Value::as_str).map(String::from))
        .ok_or(FhirError::MissingField {
            resource_type: "Coverage",
            field: "id",
        })?;

    Ok(EligibilityUpdate {
        id,
        outcome: parse_outcome(response.outcome, "CoverageEligibilityResponse")?,
        error: join_errors(&response.error),
    })
}

///
/// A ClaimResponse bundle (preauth and claim legs share the shape).
/// The correlating id is the bundle id; the approved amount is the sum
/// over the adjudication totals, in INR at 2dp.
///
pub fn claim_response(payload: &Value) -> Result<ClaimUpdate, FhirError> {
    let response: ClaimResponse = first_resource(payload, "ClaimResponse")?;

    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or(FhirError::MissingField {
            resource_type: "Bundle",
            field: "id",
        })?;

    let total: f64 = response.total.iter().map(|t| t.amount.value).sum();

    Ok(ClaimUpdate {
        id,
        outcome: parse_outcome(response.outcome, "ClaimResponse")?,
        total_approved: (total * 100.0).round() / 100.0,
        error: join_errors(&response.error),
    })
}

///
/// A payor-initiated CommunicationRequest, arriving either bare or
/// wrapped in a bundle. `about` entries resolve to claim external ids
/// through either the nested identifier or the `Type/id` reference form.
///
pub fn communication_request(payload: &Value) -> Result<InboundCommunication, FhirError> {
    let resource: CommunicationRequest = if payload["resourceType"] == "Bundle" {
        first_resource(payload, "CommunicationRequest")
            .or_else(|_| first_resource(payload, "Communication"))?
    } else {
        serde_json::from_value(payload.clone()).map_err(FhirError::Deserialize)?
    };

    let identifier = resource
        .id
        .clone()
        .or_else(|| {
            resource
                .identifier
                .first()
                .and_then(|identifier| identifier.value.clone())
        })
        .ok_or(FhirError::MissingField {
            resource_type: "CommunicationRequest",
            field: "identifier",
        })?;

    let about = resource
        .about
        .iter()
        .filter_map(|reference| {
            if let Some(identifier) = &reference.identifier {
                return identifier.value.clone();
            }
            reference
                .reference
                .as_ref()
                .and_then(|r| r.rsplit('/').next())
                .map(String::from)
        })
        .collect();

    let payload_items = resource
        .payload
        .iter()
        .filter_map(|item| {
            if let Some(text) = &item.content_string {
                return Some(ContentItem {
                    kind: CONTENT_TEXT.to_string(),
                    name: None,
                    data: text.clone(),
                });
            }
            let attachment = item.content_attachment.as_ref()?;
            if let Some(data) = &attachment.data {
                return Some(ContentItem {
                    kind: attachment
                        .content_type
                        .clone()
                        .unwrap_or_else(|| CONTENT_TEXT.to_string()),
                    name: None,
                    data: data.clone(),
                });
            }
            attachment.url.as_ref().map(|url| ContentItem {
                kind: CONTENT_URL.to_string(),
                name: attachment.title.clone(),
                data: url.clone(),
            })
        })
        .collect();

    Ok(InboundCommunication {
        identifier,
        about,
        payload: payload_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eligibility_update_reads_coverage_id_and_joins_errors() {
        let payload = json!({
            "resourceType": "Bundle",
            "id": "bundle-1",
            "type": "collection",
            "entry": [
                {
                    "fullUrl": "CoverageEligibilityResponse/r-1",
                    "resource": {
                        "resourceType": "CoverageEligibilityResponse",
                        "id": "r-1",
                        "outcome": "error",
                        "error": [
                            {"code": {"coding": [
                                {"code": "E01", "display": "member not covered"},
                                {"code": "E02", "display": "policy lapsed"}
                            ]}},
                            {"code": {"coding": [{"code": "E03", "display": "other"}]}}
                        ]
                    }
                },
                {
                    "fullUrl": "Coverage/pol-ext-1",
                    "resource": {"resourceType": "Coverage", "id": "pol-ext-1", "status": "active"}
                }
            ]
        });

        let update = eligibility_response(&payload).unwrap();
        assert_eq!(update.id, "pol-ext-1");
        assert_eq!(update.outcome, Outcome::Error);
        assert_eq!(
            update.error,
            "E01: member not covered; E02: policy lapsed, E03: other"
        );
    }

    #[test]
    fn eligibility_update_falls_back_to_bundle_id() {
        let payload = json!({
            "resourceType": "Bundle",
            "id": "pol-ext-2",
            "entry": [
                {"fullUrl": "CoverageEligibilityResponse/r-1", "resource": {
                    "resourceType": "CoverageEligibilityResponse", "outcome": "complete"
                }}
            ]
        });

        let update = eligibility_response(&payload).unwrap();
        assert_eq!(update.id, "pol-ext-2");
        assert_eq!(update.outcome, Outcome::Complete);
        assert_eq!(update.error, "");
    }

    #[test]
    fn claim_update_sums_totals_to_two_decimals() {
        let payload = json!({
            "resourceType": "Bundle",
            "id": "claim-ext-1",
            "entry": [
                {"fullUrl": "ClaimResponse/r-1", "resource": {
                    "resourceType": "ClaimResponse",
                    "outcome": "partial",
                    "total": [
                        {"amount": {"value": 899.995, "currency": "INR"}},
                        {"amount": {"value": 0.0, "currency": "INR"}}
                    ]
                }}
            ]
        });

        let update = claim_response(&payload).unwrap();
        assert_eq!(update.id, "claim-ext-1");
        assert_eq!(update.outcome, Outcome::Partial);
        assert_eq!(update.total_approved, 900.0);
    }

    #[test]
    fn unknown_outcome_is_rejected() {
        let payload = json!({
            "resourceType": "Bundle",
            "id": "claim-ext-1",
            "entry": [
                {"fullUrl": "ClaimResponse/r-1", "resource": {
                    "resourceType": "ClaimResponse", "outcome": "approved-ish"
                }}
            ]
        });

        let err = claim_response(&payload).unwrap_err();
        assert!(matches!(err, FhirError::UnknownOutcome { .. }));
    }

    #[test]
    fn communication_request_resolves_about_in_both_forms() {
        let payload = json!({
            "resourceType": "CommunicationRequest",
            "id": "corr-X",
            "about": [
                {"reference": "Claim/claim-ext-1"},
                {"identifier": {"value": "claim-ext-2"}}
            ],
            "payload": [
                {"contentString": "send discharge summary"},
                {"contentAttachment": {"url": "https://payor.example/note.pdf", "title": "note.pdf"}}
            ]
        });

        let inbound = communication_request(&payload).unwrap();
        assert_eq!(inbound.identifier, "corr-X");
        assert_eq!(inbound.about, vec!["claim-ext-1", "claim-ext-2"]);
        assert_eq!(inbound.payload.len(), 2);
        assert_eq!(inbound.payload[0].kind, CONTENT_TEXT);
        assert_eq!(inbound.payload[0].data, "send discharge summary");
        assert_eq!(inbound.payload[1].kind, CONTENT_URL);
        assert_eq!(inbound.payload[1].name.as_deref(), Some("note.pdf"));
    }

    #[test]
    fn communication_request_unwraps_bundles() {
        let payload = json!({
            "resourceType": "Bundle",
            "id": "b-1",
            "entry": [
                {"fullUrl": "Communication/corr-Y", "resource": {
                    "resourceType": "Communication",
                    "identifier": [{"value": "corr-Y"}],
                    "about": [{"reference": "Claim/claim-ext-3"}],
                    "payload": [{"contentString": "resubmit"}]
                }}
            ]
        });

        let inbound = communication_request(&payload).unwrap();
        assert_eq!(inbound.identifier, "corr-Y");
        assert_eq!(inbound.about, vec!["claim-ext-3"]);
    }
}
