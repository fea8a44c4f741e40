//! Denormalized records read from the surrounding application's store.
//!
//! The mediator references entities only by their stable external id; the
//! store resolves between internal and external identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fhir::builder::{ClaimLineItem, ContentItem};
use crate::fhir::{ClaimType, ClaimUse, Gender, Outcome, Priority, Purpose, Status};

#[derive(Clone, Debug)]
pub struct FacilityRecord {
    pub external_id: String,
    pub name: String,
    /// HFR facility id
    pub facility_id: String,
}

#[derive(Clone, Debug)]
pub struct PatientRecord {
    pub external_id: String,
    pub name: String,
    pub gender: Gender,
    pub facility: FacilityRecord,
}

#[derive(Clone, Debug)]
pub struct PolicyRecord {
    pub external_id: String,
    pub patient: PatientRecord,
    pub subscriber_id: String,
    pub policy_id: String,
    /// Insurer's participant code on the exchange
    pub insurer_code: String,
    pub insurer_name: String,
    pub status: Status,
    pub priority: Priority,
    pub purpose: Purpose,
    pub outcome: Option<Outcome>,
    pub error_text: Option<String>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ClaimRecord {
    pub external_id: String,
    pub consultation_id: String,
    pub policy: PolicyRecord,
    pub items: Vec<ClaimLineItem>,
    pub total_claim_amount: f64,
    pub total_amount_approved: Option<f64>,
    pub use_: ClaimUse,
    pub status: Status,
    pub priority: Priority,
    pub claim_type: ClaimType,
    pub outcome: Option<Outcome>,
    pub error_text: Option<String>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CommunicationRecord {
    pub external_id: String,
    /// Correlation id echoed from the gateway; rows created from inbound
    /// callbacks carry it verbatim and have no `created_by`
    pub identifier: Option<String>,
    pub claim_id: String,
    pub content: Vec<ContentItem>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A communication row to be created from an inbound callback.
#[derive(Clone, Debug)]
pub struct NewCommunication {
    pub identifier: String,
    pub claim_id: String,
    pub content: Vec<ContentItem>,
}

#[derive(Clone, Debug)]
pub struct ConsultationProcedure {
    pub external_id: String,
    pub name: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ConsultationDiagnosis {
    pub external_id: String,
    /// ICD-style label, code and description separated by the first space
    pub label: String,
    pub confirmed: bool,
    pub is_principal: bool,
}

#[derive(Clone, Debug)]
pub struct ConsultationRecord {
    pub external_id: String,
    pub patient_id: String,
    pub procedures: Vec<ConsultationProcedure>,
    /// In created order, oldest first
    pub diagnoses: Vec<ConsultationDiagnosis>,
}

/// A file in the blob store, addressed by a pre-signed read URL.
#[derive(Clone, Debug)]
pub struct FileRef {
    pub name: String,
    pub read_url: String,
}

/// A user-directed event written to the push-notification sink.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub from: String,
    pub message: String,
}

impl PushEvent {
    pub fn message(from: &str, message: &str) -> Self {
        PushEvent {
            kind: "MESSAGE".to_string(),
            from: from.to_string(),
            message: message.to_string(),
        }
    }
}
