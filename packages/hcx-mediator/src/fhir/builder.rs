//! Bundle builders for the three outbound flows.
//!
//! All builders are pure: inputs come in as denormalized descriptors, the
//! output is a `collection` Bundle whose internal references all resolve
//! within the bundle itself. Timestamps are stamped at call time in UTC.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::codes::{
    ClaimType, ClaimUse, DiagnosisType, Gender, Priority, ProcedureStatus, Purpose,
    RelatedClaimRelation, Status,
};
use super::types::*;
use super::{profiles, systems};

#[derive(Clone, Debug)]
pub struct HospitalDescriptor {
    pub id: String,
    pub name: String,
    /// HFR facility id, stamped as the provider identifier
    pub facility_id: String,
}

#[derive(Clone, Debug)]
pub struct InsurerDescriptor {
    /// Participant code on the exchange
    pub code: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct PatientDescriptor {
    pub id: String,
    pub name: String,
    pub gender: Gender,
}

#[derive(Clone, Debug)]
pub struct PolicyDescriptor {
    pub subscriber_id: String,
    /// Insurer-issued policy number
    pub policy_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClaimLineItem {
    pub id: String,
    pub name: String,
    /// Per-unit price in INR
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SupportingDocument {
    pub doc_type: String,
    pub url: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RelatedClaim {
    pub id: String,
    pub relation: RelatedClaimRelation,
}

#[derive(Clone, Debug)]
pub struct ProcedureDescriptor {
    pub id: String,
    pub name: String,
    pub performed: Option<String>,
    pub status: ProcedureStatus,
}

#[derive(Clone, Debug)]
pub struct DiagnosisDescriptor {
    pub id: String,
    pub code: String,
    pub label: String,
    pub diagnosis_type: DiagnosisType,
}

/// One item of a communication payload, `{type, name?, data}` on the wire.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub data: String,
}

pub const CONTENT_TEXT: &str = "text";
pub const CONTENT_URL: &str = "url";

fn provider_profile(hospital: &HospitalDescriptor) -> Organization {
    Organization {
        resource_type: "Organization".to_string(),
        id: hospital.id.clone(),
        meta: Meta::profiled(profiles::ORGANIZATION, Utc::now()),
        identifier: vec![Identifier::typed(
            Coding::with_display(systems::CODES, "AC", &hospital.name),
            systems::PROVIDER_IDENTIFIER,
            &hospital.facility_id,
        )],
        name: hospital.name.clone(),
    }
}

fn insurer_profile(insurer: &InsurerDescriptor) -> Organization {
    Organization {
        resource_type: "Organization".to_string(),
        id: insurer.code.clone(),
        meta: Meta::profiled(profiles::ORGANIZATION, Utc::now()),
        identifier: vec![Identifier::typed(
            Coding::with_display(systems::CODES, "AC", &insurer.name),
            systems::INSURER_IDENTIFIER,
            &insurer.code,
        )],
        name: insurer.name.clone(),
    }
}

fn patient_profile(patient: &PatientDescriptor, subscriber_id: &str) -> Patient {
    Patient {
        resource_type: "Patient".to_string(),
        id: patient.id.clone(),
        meta: Meta::profiled(profiles::PATIENT, Utc::now()),
        identifier: vec![Identifier::typed(
            Coding::with_display(systems::CODES, "SN", "Subscriber Number"),
            systems::PATIENT_IDENTIFIER,
            subscriber_id,
        )],
        name: vec![HumanName {
            text: patient.name.clone(),
        }],
        gender: patient.gender,
    }
}

fn coverage_profile(
    coverage_id: &str,
    policy: &PolicyDescriptor,
    patient: &Patient,
    insurer: &Organization,
) -> Coverage {
    let patient_ref = Reference::local("Patient", &patient.id);
    Coverage {
        resource_type: "Coverage".to_string(),
        id: coverage_id.to_string(),
        meta: Meta::profiled(profiles::COVERAGE, Utc::now()),
        identifier: vec![Identifier::with_system(
            systems::COVERAGE_IDENTIFIER,
            &policy.policy_id,
        )],
        status: Status::Active.as_str().to_string(),
        subscriber: patient_ref.clone(),
        subscriber_id: policy.subscriber_id.clone(),
        beneficiary: patient_ref,
        relationship: CodeableConcept::of(Coding::new(systems::COVERAGE_RELATIONSHIP, "self")),
        payor: vec![Reference::local("Organization", &insurer.id)],
    }
}

///
/// Coverage-eligibility request: exactly five entries, in order
/// CoverageEligibilityRequest, Organization(provider), Organization(insurer),
/// Patient, Coverage.
///
pub fn eligibility_check_bundle(
    bundle_id: &str,
    hospital: &HospitalDescriptor,
    insurer: &InsurerDescriptor,
    patient: &PatientDescriptor,
    policy: &PolicyDescriptor,
    priority: Priority,
    purpose: Purpose,
) -> Bundle {
    let now = Utc::now();

    let provider = provider_profile(hospital);
    let insurer_org = insurer_profile(insurer);
    let patient_res = patient_profile(patient, &policy.subscriber_id);
    let coverage = coverage_profile(bundle_id, policy, &patient_res, &insurer_org);

    let request = CoverageEligibilityRequest {
        resource_type: "CoverageEligibilityRequest".to_string(),
        id: bundle_id.to_string(),
        meta: Meta::profiled(profiles::COVERAGE_ELIGIBILITY_REQUEST, now),
        identifier: vec![Identifier::simple(bundle_id)],
        status: Status::Active.as_str().to_string(),
        priority: CodeableConcept::of(Coding::new(systems::PRIORITY, priority.as_str())),
        purpose: vec![purpose],
        patient: Reference::local("Patient", &patient_res.id),
        serviced_period: Period {
            start: Some(now),
            end: Some(now),
        },
        created: now,
        provider: Reference::local("Organization", &provider.id),
        insurer: Reference::local("Organization", &insurer_org.id),
        insurance: vec![EligibilityInsurance {
            coverage: Reference::local("Coverage", &coverage.id),
        }],
    };

    let mut bundle = Bundle::collection(
        bundle_id,
        Identifier::with_system(systems::BUNDLE_IDENTIFIER, bundle_id),
        profiles::COVERAGE_ELIGIBILITY_REQUEST_BUNDLE,
        now,
    );
    bundle.push("CoverageEligibilityRequest", &request.id, &request);
    bundle.push("Organization", &provider.id, &provider);
    bundle.push("Organization", &insurer_org.id, &insurer_org);
    bundle.push("Patient", &patient_res.id, &patient_res);
    bundle.push("Coverage", &coverage.id, &coverage);
    bundle
}

pub struct ClaimBundleInputs<'a> {
    pub bundle_id: &'a str,
    pub claim_id: &'a str,
    pub hospital: &'a HospitalDescriptor,
    pub insurer: &'a InsurerDescriptor,
    pub patient: &'a PatientDescriptor,
    pub policy: &'a PolicyDescriptor,
    pub items: &'a [ClaimLineItem],
    pub use_: ClaimUse,
    pub status: Status,
    pub claim_type: ClaimType,
    pub priority: Priority,
    pub supporting_info: &'a [SupportingDocument],
    pub related_claims: &'a [RelatedClaim],
    pub procedures: &'a [ProcedureDescriptor],
    pub diagnoses: &'a [DiagnosisDescriptor],
}

///
/// Claim / preauthorization / predetermination bundle.
///
pub fn claim_bundle(inputs: &ClaimBundleInputs) -> Bundle {
    let now = Utc::now();

    let provider = provider_profile(inputs.hospital);
    let insurer_org = insurer_profile(inputs.insurer);
    let patient_res = patient_profile(inputs.patient, &inputs.policy.subscriber_id);
    let coverage = coverage_profile(
        &inputs.policy.policy_id,
        inputs.policy,
        &patient_res,
        &insurer_org,
    );

    let patient_ref = Reference::local("Patient", &patient_res.id);
    let provider_ref = Reference::local("Organization", &provider.id);

    let procedures: Vec<Procedure> = inputs
        .procedures
        .iter()
        .map(|p| Procedure {
            resource_type: "Procedure".to_string(),
            id: p.id.clone(),
            status: p.status,
            note: vec![Annotation {
                text: p.name.clone(),
            }],
            subject: patient_ref.clone(),
            performer: vec![ProcedurePerformer {
                actor: provider_ref.clone(),
            }],
            performed_string: p.performed.clone(),
        })
        .collect();

    let conditions: Vec<Condition> = inputs
        .diagnoses
        .iter()
        .map(|d| Condition {
            resource_type: "Condition".to_string(),
            id: d.id.clone(),
            code: CodeableConcept::of(Coding::with_display(
                systems::CONDITION,
                &d.code,
                &d.label,
            )),
            subject: patient_ref.clone(),
        })
        .collect();

    let claim = Claim {
        resource_type: "Claim".to_string(),
        id: inputs.claim_id.to_string(),
        meta: Meta::profiled(profiles::CLAIM, now),
        identifier: vec![Identifier::with_system(
            systems::BUNDLE_IDENTIFIER,
            inputs.claim_id,
        )],
        status: inputs.status.as_str().to_string(),
        claim_type: CodeableConcept::of(Coding::new(
            systems::CLAIM_TYPE,
            inputs.claim_type.as_str(),
        )),
        use_: inputs.use_,
        related: inputs
            .related_claims
            .iter()
            .map(|related| ClaimRelated {
                id: related.id.clone(),
                relationship: CodeableConcept::of(Coding::new(
                    systems::RELATED_CLAIM_RELATIONSHIP,
                    related.relation.as_str(),
                )),
                claim: Reference::local("Claim", &related.id),
            })
            .collect(),
        patient: patient_ref.clone(),
        created: now,
        insurer: Reference::local("Organization", &insurer_org.id),
        provider: provider_ref.clone(),
        priority: CodeableConcept::of(Coding::new(systems::PRIORITY, inputs.priority.as_str())),
        payee: ClaimPayee {
            payee_type: CodeableConcept::of(Coding::new(systems::CLAIM_PAYEE_TYPE, "provider")),
            party: provider_ref.clone(),
        },
        care_team: vec![ClaimCareTeam {
            sequence: 1,
            provider: provider_ref,
        }],
        insurance: vec![ClaimInsurance {
            sequence: 1,
            focal: true,
            coverage: Reference::local("Coverage", &coverage.id),
        }],
        item: inputs
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| ClaimItem {
                sequence: i as u32 + 1,
                product_or_service: CodeableConcept::of(Coding::with_display(
                    systems::CLAIM_ITEM,
                    &item.id,
                    &item.name,
                )),
                unit_price: Money::inr(item.price),
                category: item.category.as_ref().map(|category| {
                    let system = if category == "HBP" {
                        systems::CLAIM_ITEM_CATEGORY_PMJAY
                    } else {
                        systems::CLAIM_ITEM_CATEGORY
                    };
                    CodeableConcept::of(Coding::new(system, category))
                }),
            })
            .collect(),
        supporting_info: inputs
            .supporting_info
            .iter()
            .enumerate()
            .map(|(i, info)| ClaimSupportingInfo {
                sequence: i as u32 + 1,
                category: CodeableConcept::of(Coding::new(
                    systems::CLAIM_SUPPORTING_INFO_CATEGORY,
                    &info.doc_type,
                )),
                value_attachment: Attachment {
                    url: Some(info.url.clone()),
                    title: info.name.clone(),
                    ..Attachment::default()
                },
            })
            .collect(),
        procedure: procedures
            .iter()
            .enumerate()
            .map(|(i, p)| ClaimProcedure {
                sequence: i as u32 + 1,
                procedure_reference: Reference::local("Procedure", &p.id),
            })
            .collect(),
        diagnosis: inputs
            .diagnoses
            .iter()
            .enumerate()
            .map(|(i, d)| ClaimDiagnosis {
                sequence: i as u32 + 1,
                diagnosis_reference: Reference::local("Condition", &d.id),
                diagnosis_type: vec![CodeableConcept::of(Coding::new(
                    systems::DIAGNOSIS_TYPE,
                    d.diagnosis_type.as_str(),
                ))],
            })
            .collect(),
    };

    let mut bundle = Bundle::collection(
        inputs.bundle_id,
        Identifier::with_system(systems::BUNDLE_IDENTIFIER, inputs.bundle_id),
        profiles::CLAIM_BUNDLE,
        now,
    );
    bundle.push("Claim", &claim.id, &claim);
    bundle.push("Organization", &provider.id, &provider);
    bundle.push("Organization", &insurer_org.id, &insurer_org);
    bundle.push("Patient", &patient_res.id, &patient_res);
    bundle.push("Coverage", &coverage.id, &coverage);
    for p in &procedures {
        bundle.push("Procedure", &p.id, p);
    }
    for c in &conditions {
        bundle.push("Condition", &c.id, c);
    }
    bundle
}

///
/// Communication bundle: a single Communication resource carrying the
/// payload items, `about` pointing at the claims under discussion.
///
pub fn communication_bundle(
    bundle_id: &str,
    communication_id: &str,
    identifier_value: &str,
    payload: &[ContentItem],
    about_claim_ids: &[String],
) -> Bundle {
    let now = Utc::now();

    let communication = Communication {
        resource_type: "Communication".to_string(),
        id: communication_id.to_string(),
        meta: Meta::profiled(profiles::COMMUNICATION, now),
        identifier: vec![Identifier::with_system(
            systems::COMMUNICATION_IDENTIFIER,
            identifier_value,
        )],
        status: "completed".to_string(),
        about: about_claim_ids
            .iter()
            .map(|id| Reference::local("Claim", id))
            .collect(),
        payload: payload
            .iter()
            .map(|item| match item.kind.as_str() {
                CONTENT_TEXT => CommunicationPayload {
                    content_string: Some(item.data.clone()),
                    content_attachment: None,
                },
                _ => CommunicationPayload {
                    content_string: None,
                    content_attachment: Some(Attachment {
                        url: Some(item.data.clone()),
                        title: item.name.clone(),
                        ..Attachment::default()
                    }),
                },
            })
            .collect(),
    };

    let mut bundle = Bundle::collection(
        bundle_id,
        Identifier::with_system(systems::BUNDLE_IDENTIFIER, bundle_id),
        profiles::COMMUNICATION_BUNDLE,
        now,
    );
    bundle.push("Communication", &communication.id, &communication);
    bundle
}
