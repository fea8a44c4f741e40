//! The three user-facing actions: marshal entity data into builder
//! inputs, drive the dispatcher, return the gateway's ack.
//!
//! Send failures mutate nothing; the claim/policy outcome stays unset
//! until the payor's asynchronous callback lands.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Error;
use crate::fhir::builder::{
    claim_bundle, communication_bundle, eligibility_check_bundle, ClaimBundleInputs, ContentItem,
    DiagnosisDescriptor, HospitalDescriptor, InsurerDescriptor, PatientDescriptor,
    PolicyDescriptor, ProcedureDescriptor, RelatedClaim, SupportingDocument, CONTENT_URL,
};
use crate::fhir::{validate, ClaimUse, DiagnosisType, ProcedureStatus, RelatedClaimRelation};
use crate::log::PROTOCOL;
use crate::mediator::Mediator;
use crate::protocol::Operation;
use crate::store::{ClaimRecord, PolicyRecord};

/// Supporting-info category for a medical-benefit document.
const DOC_TYPE_MEDICAL_BENEFIT: &str = "MB";

/// Supporting-info category for a discharge summary.
const DOC_TYPE_DISCHARGE_SUMMARY: &str = "DIA";

///
/// Derive a claim procedure's status from its scheduled time: already
/// performed means completed, scheduled ahead means preparation, no
/// schedule means it is underway.
///
pub fn procedure_status(scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ProcedureStatus {
    match scheduled_at {
        Some(at) if at < now => ProcedureStatus::Completed,
        Some(_) => ProcedureStatus::Preparation,
        None => ProcedureStatus::InProgress,
    }
}

///
/// Split an ICD-style diagnosis label into `(code, description)` at the
/// first space.
///
pub fn split_diagnosis_label(label: &str) -> (&str, &str) {
    label.split_once(' ').unwrap_or((label, ""))
}

fn hospital_of(policy: &PolicyRecord) -> HospitalDescriptor {
    HospitalDescriptor {
        id: policy.patient.facility.external_id.clone(),
        name: policy.patient.facility.name.clone(),
        facility_id: policy.patient.facility.facility_id.clone(),
    }
}

fn insurer_of(policy: &PolicyRecord) -> InsurerDescriptor {
    InsurerDescriptor {
        code: policy.insurer_code.clone(),
        name: policy.insurer_name.clone(),
    }
}

fn patient_of(policy: &PolicyRecord) -> PatientDescriptor {
    PatientDescriptor {
        id: policy.patient.external_id.clone(),
        name: policy.patient.name.clone(),
        gender: policy.patient.gender,
    }
}

fn policy_of(policy: &PolicyRecord) -> PolicyDescriptor {
    PolicyDescriptor {
        subscriber_id: policy.subscriber_id.clone(),
        policy_id: policy.policy_id.clone(),
    }
}

impl Mediator {
    ///
    /// Coverage-eligibility check for a policy. Returns the gateway ack.
    ///
    pub async fn check_eligibility(
        &self,
        policy_external_id: &str,
        actor: &str,
    ) -> Result<Value, Error> {
        let policy = self.store.policy(policy_external_id).await?;

        let bundle = eligibility_check_bundle(
            &policy.external_id,
            &hospital_of(&policy),
            &insurer_of(&policy),
            &patient_of(&policy),
            &policy_of(&policy),
            policy.priority,
            policy.purpose,
        );

        info!(
            target: PROTOCOL,
            msg = "Eligibility check",
            policy = policy.external_id,
            insurer = policy.insurer_code,
            actor,
        );

        let dispatch = self
            .dispatcher
            .send(
                &bundle,
                Operation::CoverageEligibilityCheck,
                &policy.insurer_code,
                None,
            )
            .await?;

        Ok(dispatch.ack)
    }

    ///
    /// Submit a claim or preauthorization. Enriches the claim's line items
    /// with the consultation's procedures and confirmed diagnoses, prior
    /// claims on the same consultation, and the supporting documents held
    /// in the blob store.
    ///
    pub async fn make_claim(&self, claim_external_id: &str, actor: &str) -> Result<Value, Error> {
        let claim = self.store.claim(claim_external_id).await?;
        let consultation = self.store.consultation(&claim.consultation_id).await?;
        let policy = &claim.policy;

        let now = Utc::now();
        let procedures: Vec<ProcedureDescriptor> = consultation
            .procedures
            .iter()
            .map(|p| ProcedureDescriptor {
                id: p.external_id.clone(),
                name: p.name.clone(),
                performed: p
                    .scheduled_at
                    .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                status: procedure_status(p.scheduled_at, now),
            })
            .collect();

        // Confirmed diagnoses, in created order; principal keeps its flag
        // regardless of position
        let diagnoses: Vec<DiagnosisDescriptor> = consultation
            .diagnoses
            .iter()
            .filter(|d| d.confirmed)
            .map(|d| {
                let (code, description) = split_diagnosis_label(&d.label);
                DiagnosisDescriptor {
                    id: d.external_id.clone(),
                    code: code.to_string(),
                    label: description.to_string(),
                    diagnosis_type: if d.is_principal {
                        DiagnosisType::Principal
                    } else {
                        DiagnosisType::Clinical
                    },
                }
            })
            .collect();

        let related_claims: Vec<RelatedClaim> = self
            .store
            .prior_claims(&claim.consultation_id, &claim.external_id)
            .await?
            .into_iter()
            .map(|prior| RelatedClaim {
                id: prior.external_id,
                relation: RelatedClaimRelation::Prior,
            })
            .collect();

        let supporting_info = self.collect_supporting_documents(&claim).await?;

        let operation = if claim.use_ == ClaimUse::Claim {
            Operation::ClaimSubmit
        } else {
            Operation::PreauthSubmit
        };

        let bundle = claim_bundle(&ClaimBundleInputs {
            bundle_id: &claim.external_id,
            claim_id: &claim.external_id,
            hospital: &hospital_of(policy),
            insurer: &insurer_of(policy),
            patient: &patient_of(policy),
            policy: &policy_of(policy),
            items: &claim.items,
            use_: claim.use_,
            status: claim.status,
            claim_type: claim.claim_type,
            priority: claim.priority,
            supporting_info: &supporting_info,
            related_claims: &related_claims,
            procedures: &procedures,
            diagnoses: &diagnoses,
        });

        info!(
            target: PROTOCOL,
            msg = "Claim submission",
            claim = claim.external_id,
            operation = operation.path(),
            insurer = policy.insurer_code,
            related = related_claims.len(),
            documents = supporting_info.len(),
            actor,
        );

        let dispatch = self
            .dispatcher
            .send(&bundle, operation, &policy.insurer_code, None)
            .await?;

        Ok(dispatch.ack)
    }

    async fn collect_supporting_documents(
        &self,
        claim: &ClaimRecord,
    ) -> Result<Vec<SupportingDocument>, Error> {
        let mut documents = Vec::new();

        for external_id in [&claim.consultation_id, &claim.external_id] {
            for file in self.blobs.files_for(external_id).await? {
                documents.push(SupportingDocument {
                    doc_type: DOC_TYPE_MEDICAL_BENEFIT.to_string(),
                    url: file.read_url,
                    name: Some(file.name),
                });
            }
        }

        // Final claims carry the discharge summary as well
        if claim.use_ == ClaimUse::Claim {
            let summary = self
                .blobs
                .discharge_summary(&claim.policy.patient.external_id)
                .await?;
            documents.push(SupportingDocument {
                doc_type: DOC_TYPE_DISCHARGE_SUMMARY.to_string(),
                url: summary.read_url,
                name: Some(summary.name),
            });
        }

        Ok(documents)
    }

    ///
    /// Send a user-authored communication back to the payor, as the
    /// response leg of the conversation the payor opened. The bundle is
    /// validated remotely before dispatch; validation failures carry the
    /// validator's issues back to the caller.
    ///
    pub async fn send_communication(
        &self,
        communication_external_id: &str,
        actor: &str,
    ) -> Result<Value, Error> {
        let communication = self.store.communication(communication_external_id).await?;
        let claim = self.store.claim(&communication.claim_id).await?;

        let mut payload = communication.content.clone();
        for file in self.blobs.files_for(&communication.external_id).await? {
            payload.push(ContentItem {
                kind: CONTENT_URL.to_string(),
                name: Some(file.name),
                data: file.read_url,
            });
        }

        let bundle = communication_bundle(
            &communication.external_id,
            &communication.external_id,
            communication
                .identifier
                .as_deref()
                .unwrap_or(&communication.external_id),
            &payload,
            &[claim.external_id.clone()],
        );

        validate::validate_remote(
            &self.http,
            &self.config.gateway.ig_url,
            &serde_json::to_value(&bundle)?,
        )
        .await?;

        // The conversation's correlation id is whatever the payor minted
        // on its first message for this claim
        let correlation_id = self
            .store
            .earliest_inbound_communication(&claim.external_id)
            .await?
            .and_then(|first| first.identifier);

        debug!(
            target: PROTOCOL,
            msg = "Communication response",
            communication = communication.external_id,
            claim = claim.external_id,
            correlation_id = correlation_id.as_deref().unwrap_or("<fresh>"),
            actor,
        );

        let dispatch = self
            .dispatcher
            .send(
                &bundle,
                Operation::CommunicationOnRequest,
                &claim.policy.insurer_code,
                correlation_id.as_deref(),
            )
            .await?;

        Ok(dispatch.ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn procedure_status_derivation() {
        let now = Utc::now();

        assert_eq!(
            procedure_status(Some(now - Duration::seconds(1)), now),
            ProcedureStatus::Completed
        );
        assert_eq!(
            procedure_status(Some(now + Duration::seconds(1)), now),
            ProcedureStatus::Preparation
        );
        assert_eq!(procedure_status(Some(now), now), ProcedureStatus::Preparation);
        assert_eq!(procedure_status(None, now), ProcedureStatus::InProgress);
    }

    #[test]
    fn diagnosis_label_splits_at_first_space() {
        assert_eq!(
            split_diagnosis_label("K35.8 Acute appendicitis, unspecified"),
            ("K35.8", "Acute appendicitis, unspecified")
        );
        assert_eq!(split_diagnosis_label("K35.8"), ("K35.8", ""));
    }
}
