//! Serde model for the FHIR R4 resources the exchange traffics in.
//!
//! References between resources are plain `"<ResourceType>/<id>"` strings,
//! never in-memory pointers; a bundle is a flat arena of entries and every
//! reference resolves by string lookup within it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codes::{ClaimUse, Gender, ProcedureStatus, Purpose};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: &str) -> Self {
        Coding {
            system: Some(system.to_string()),
            code: Some(code.to_string()),
            display: None,
        }
    }

    pub fn with_display(system: &str, code: &str, display: &str) -> Self {
        Coding {
            system: Some(system.to_string()),
            code: Some(code.to_string()),
            display: Some(display.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
}

impl CodeableConcept {
    pub fn of(coding: Coding) -> Self {
        CodeableConcept {
            coding: vec![coding],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Identifier {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub identifier_type: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Identifier {
    pub fn simple(value: &str) -> Self {
        Identifier {
            identifier_type: None,
            system: None,
            value: Some(value.to_string()),
        }
    }

    pub fn with_system(system: &str, value: &str) -> Self {
        Identifier {
            identifier_type: None,
            system: Some(system.to_string()),
            value: Some(value.to_string()),
        }
    }

    pub fn typed(coding: Coding, system: &str, value: &str) -> Self {
        Identifier {
            identifier_type: Some(CodeableConcept::of(coding)),
            system: Some(system.to_string()),
            value: Some(value.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Box<Identifier>>,
}

impl Reference {
    /// A reference to a resource in the same bundle, by arena key.
    pub fn local(resource_type: &str, id: &str) -> Self {
        Reference {
            reference: Some(format!("{resource_type}/{id}")),
            reference_type: None,
            identifier: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
}

impl Meta {
    pub fn profiled(profile: &str, last_updated: DateTime<Utc>) -> Self {
        Meta {
            last_updated: Some(last_updated),
            profile: vec![profile.to_string()],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Money {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Money {
    pub fn inr(value: f64) -> Self {
        Money {
            value,
            currency: Some("INR".to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HumanName {
    pub text: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
}

// --- Resources ---

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub name: Vec<HumanName>,
    pub gender: Gender,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub subscriber: Reference,
    pub subscriber_id: String,
    pub beneficiary: Reference,
    pub relationship: CodeableConcept,
    pub payor: Vec<Reference>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEligibilityRequest {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub priority: CodeableConcept,
    pub purpose: Vec<Purpose>,
    pub patient: Reference,
    pub serviced_period: Period,
    pub created: DateTime<Utc>,
    pub provider: Reference,
    pub insurer: Reference,
    pub insurance: Vec<EligibilityInsurance>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EligibilityInsurance {
    pub coverage: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    #[serde(rename = "type")]
    pub claim_type: CodeableConcept,
    #[serde(rename = "use")]
    pub use_: ClaimUse,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<ClaimRelated>,
    pub patient: Reference,
    pub created: DateTime<Utc>,
    pub insurer: Reference,
    pub provider: Reference,
    pub priority: CodeableConcept,
    pub payee: ClaimPayee,
    pub care_team: Vec<ClaimCareTeam>,
    pub insurance: Vec<ClaimInsurance>,
    pub item: Vec<ClaimItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supporting_info: Vec<ClaimSupportingInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedure: Vec<ClaimProcedure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnosis: Vec<ClaimDiagnosis>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClaimRelated {
    pub id: String,
    pub relationship: CodeableConcept,
    pub claim: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayee {
    #[serde(rename = "type")]
    pub payee_type: CodeableConcept,
    pub party: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClaimCareTeam {
    pub sequence: u32,
    pub provider: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClaimInsurance {
    pub sequence: u32,
    pub focal: bool,
    pub coverage: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItem {
    pub sequence: u32,
    pub product_or_service: CodeableConcept,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CodeableConcept>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSupportingInfo {
    pub sequence: u32,
    pub category: CodeableConcept,
    pub value_attachment: Attachment,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProcedure {
    pub sequence: u32,
    pub procedure_reference: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDiagnosis {
    pub sequence: u32,
    pub diagnosis_reference: Reference,
    #[serde(rename = "type")]
    pub diagnosis_type: Vec<CodeableConcept>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub resource_type: String,
    pub id: String,
    pub status: ProcedureStatus,
    pub note: Vec<Annotation>,
    pub subject: Reference,
    pub performer: Vec<ProcedurePerformer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_string: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProcedurePerformer {
    pub actor: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub resource_type: String,
    pub id: String,
    pub code: CodeableConcept,
    pub subject: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub resource_type: String,
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub about: Vec<Reference>,
    pub payload: Vec<CommunicationPayload>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_attachment: Option<Attachment>,
}

// --- Bundle ---

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// Entries hold raw JSON so a bundle can carry resource types this crate
/// does not model; typed access goes through `parse::first_resource`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: Value,
}

impl Bundle {
    pub fn collection(
        id: &str,
        identifier: Identifier,
        profile: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Bundle {
            resource_type: "Bundle".to_string(),
            id: id.to_string(),
            meta: Some(Meta::profiled(profile, timestamp)),
            identifier: Some(identifier),
            bundle_type: "collection".to_string(),
            timestamp: Some(timestamp),
            entry: Vec::new(),
        }
    }

    /// Append a typed resource to the arena under its `Type/id` key.
    pub fn push<T: Serialize>(&mut self, resource_type: &str, id: &str, resource: &T) {
        let full_url = format!("{resource_type}/{id}");
        let resource = serde_json::to_value(resource).expect("resource serializes");
        self.entry.push(BundleEntry { full_url, resource });
    }
}

// --- Response-side resources ---

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResponseError {
    #[serde(default)]
    pub code: CodeableConcept,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CoverageEligibilityResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub error: Vec<ResponseError>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClaimResponseTotal {
    pub amount: Money,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClaimResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub total: Vec<ClaimResponseTotal>,
    #[serde(default)]
    pub error: Vec<ResponseError>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommunicationRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub identifier: Vec<Identifier>,
    #[serde(default)]
    pub about: Vec<Reference>,
    #[serde(default)]
    pub payload: Vec<CommunicationPayload>,
}
