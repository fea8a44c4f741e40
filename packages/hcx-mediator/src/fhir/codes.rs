//! Code values shared between the wire model and the entity records.
//!
//! Each enum mirrors an hl7 value set; the serde representation is the
//! wire code.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

// http://hl7.org/fhir/fm-status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Cancelled,
    Draft,
    #[serde(rename = "entered-in-error")]
    EnteredInError,
}

// http://terminology.hl7.org/CodeSystem/processpriority
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Stat,
    Normal,
    Deferred,
}

// http://hl7.org/fhir/eligibilityrequest-purpose
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    #[serde(rename = "auth-requirements")]
    AuthRequirements,
    Benefits,
    Discovery,
    Validation,
}

// http://hl7.org/fhir/remittance-outcome
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Queued,
    Complete,
    Error,
    Partial,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimUse {
    Claim,
    Preauthorization,
    Predetermination,
}

// http://terminology.hl7.org/CodeSystem/claim-type
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Institutional,
    Oral,
    Pharmacy,
    Professional,
    Vision,
}

// http://hl7.org/fhir/event-status, reduced to the states a consultation
// procedure can be in
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureStatus {
    Preparation,
    #[serde(rename = "in-progress")]
    InProgress,
    Completed,
}

// http://terminology.hl7.org/CodeSystem/ex-diagnosistype
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisType {
    Principal,
    Clinical,
}

// http://terminology.hl7.org/CodeSystem/ex-relatedclaimrelationship
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedClaimRelation {
    Prior,
    Associated,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

macro_rules! code_str {
    ($($ty:ty { $($variant:path => $code:literal),+ $(,)? })+) => {
        $(
            impl $ty {
                pub fn as_str(&self) -> &'static str {
                    match self {
                        $($variant => $code),+
                    }
                }
            }

            impl Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

code_str! {
    Status {
        Status::Active => "active",
        Status::Cancelled => "cancelled",
        Status::Draft => "draft",
        Status::EnteredInError => "entered-in-error",
    }
    Priority {
        Priority::Stat => "stat",
        Priority::Normal => "normal",
        Priority::Deferred => "deferred",
    }
    Purpose {
        Purpose::AuthRequirements => "auth-requirements",
        Purpose::Benefits => "benefits",
        Purpose::Discovery => "discovery",
        Purpose::Validation => "validation",
    }
    Outcome {
        Outcome::Queued => "queued",
        Outcome::Complete => "complete",
        Outcome::Error => "error",
        Outcome::Partial => "partial",
    }
    ClaimUse {
        ClaimUse::Claim => "claim",
        ClaimUse::Preauthorization => "preauthorization",
        ClaimUse::Predetermination => "predetermination",
    }
    ClaimType {
        ClaimType::Institutional => "institutional",
        ClaimType::Oral => "oral",
        ClaimType::Pharmacy => "pharmacy",
        ClaimType::Professional => "professional",
        ClaimType::Vision => "vision",
    }
    ProcedureStatus {
        ProcedureStatus::Preparation => "preparation",
        ProcedureStatus::InProgress => "in-progress",
        ProcedureStatus::Completed => "completed",
    }
    DiagnosisType {
        DiagnosisType::Principal => "principal",
        DiagnosisType::Clinical => "clinical",
    }
    RelatedClaimRelation {
        RelatedClaimRelation::Prior => "prior",
        RelatedClaimRelation::Associated => "associated",
    }
    Gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "other",
    }
}

impl Outcome {
    /// Parse a remittance-outcome code from an inbound response.
    pub fn parse(value: &str) -> Option<Outcome> {
        match value {
            "queued" => Some(Outcome::Queued),
            "complete" => Some(Outcome::Complete),
            "error" => Some(Outcome::Error),
            "partial" => Some(Outcome::Partial),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_to_wire_values() {
        assert_eq!(serde_json::to_value(Status::EnteredInError).unwrap(), "entered-in-error");
        assert_eq!(serde_json::to_value(Purpose::AuthRequirements).unwrap(), "auth-requirements");
        assert_eq!(serde_json::to_value(ProcedureStatus::InProgress).unwrap(), "in-progress");
        assert_eq!(serde_json::to_value(ClaimUse::Preauthorization).unwrap(), "preauthorization");
    }

    #[test]
    fn outcome_parse_is_strict() {
        assert_eq!(Outcome::parse("partial"), Some(Outcome::Partial));
        assert_eq!(Outcome::parse("Complete"), None);
        assert_eq!(Outcome::parse(""), None);
    }
}
