//! In-memory store used by the test suites and the dev server.
//!
//! Real deployments embed the mediator and implement the seams over their
//! own database; this one keeps everything under a handful of mutexes and
//! preserves insertion order where the traits promise an ordering.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    BlobStore, ClaimRecord, CommunicationRecord, ConsultationRecord, EntityStore, FileRef,
    NewCommunication, NotificationSink, PolicyRecord, PushEvent,
};
use crate::error::Error;
use crate::fhir::Outcome;

#[derive(Default)]
pub struct MemoryStore {
    policies: Mutex<HashMap<String, PolicyRecord>>,
    claims: Mutex<HashMap<String, ClaimRecord>>,
    consultations: Mutex<HashMap<String, ConsultationRecord>>,
    communications: Mutex<Vec<CommunicationRecord>>,
    files: Mutex<HashMap<String, Vec<FileRef>>>,
    pushes: Mutex<Vec<(String, PushEvent)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn insert_policy(&self, policy: PolicyRecord) {
        self.policies
            .lock()
            .unwrap()
            .insert(policy.external_id.clone(), policy);
    }

    pub fn insert_claim(&self, claim: ClaimRecord) {
        self.claims
            .lock()
            .unwrap()
            .insert(claim.external_id.clone(), claim);
    }

    pub fn insert_consultation(&self, consultation: ConsultationRecord) {
        self.consultations
            .lock()
            .unwrap()
            .insert(consultation.external_id.clone(), consultation);
    }

    pub fn insert_communication(&self, communication: CommunicationRecord) {
        self.communications.lock().unwrap().push(communication);
    }

    pub fn attach_file(&self, external_id: &str, file: FileRef) {
        self.files
            .lock()
            .unwrap()
            .entry(external_id.to_string())
            .or_default()
            .push(file);
    }

    /// Notifications recorded so far, oldest first.
    pub fn pushes(&self) -> Vec<(String, PushEvent)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn communications(&self) -> Vec<CommunicationRecord> {
        self.communications.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn policy(&self, external_id: &str) -> Result<PolicyRecord, Error> {
        self.policies
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Policy",
                id: external_id.to_string(),
            })
    }

    async fn claim(&self, external_id: &str) -> Result<ClaimRecord, Error> {
        self.claims
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Claim",
                id: external_id.to_string(),
            })
    }

    async fn consultation(&self, external_id: &str) -> Result<ConsultationRecord, Error> {
        self.consultations
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Consultation",
                id: external_id.to_string(),
            })
    }

    async fn communication(&self, external_id: &str) -> Result<CommunicationRecord, Error> {
        self.communications
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.external_id == external_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Communication",
                id: external_id.to_string(),
            })
    }

    async fn set_policy_outcome(
        &self,
        external_id: &str,
        outcome: Outcome,
        error_text: &str,
    ) -> Result<(), Error> {
        let mut policies = self.policies.lock().unwrap();
        let policy = policies
            .get_mut(external_id)
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Policy",
                id: external_id.to_string(),
            })?;
        policy.outcome = Some(outcome);
        policy.error_text = Some(error_text.to_string());
        Ok(())
    }

    async fn set_claim_outcome(
        &self,
        external_id: &str,
        outcome: Outcome,
        total_amount_approved: f64,
        error_text: &str,
    ) -> Result<(), Error> {
        let mut claims = self.claims.lock().unwrap();
        let claim = claims
            .get_mut(external_id)
            .ok_or_else(|| Error::EntityNotFound {
                kind: "Claim",
                id: external_id.to_string(),
            })?;
        claim.outcome = Some(outcome);
        claim.total_amount_approved = Some(total_amount_approved);
        claim.error_text = Some(error_text.to_string());
        claim.modified_at = Utc::now();
        Ok(())
    }

    async fn create_communication(
        &self,
        new: NewCommunication,
    ) -> Result<CommunicationRecord, Error> {
        let record = CommunicationRecord {
            external_id: Uuid::new_v4().to_string(),
            identifier: Some(new.identifier),
            claim_id: new.claim_id,
            content: new.content,
            created_by: None,
            created_at: Utc::now(),
        };
        self.communications.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn prior_claims(
        &self,
        consultation_id: &str,
        except_claim_id: &str,
    ) -> Result<Vec<ClaimRecord>, Error> {
        let mut matches: Vec<ClaimRecord> = self
            .claims
            .lock()
            .unwrap()
            .values()
            .filter(|claim| {
                claim.consultation_id == consultation_id && claim.external_id != except_claim_id
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(matches)
    }

    async fn earliest_inbound_communication(
        &self,
        claim_id: &str,
    ) -> Result<Option<CommunicationRecord>, Error> {
        Ok(self
            .communications
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.claim_id == claim_id && record.created_by.is_none())
            .min_by_key(|record| record.created_at)
            .cloned())
    }
}

#[async_trait]
impl NotificationSink for MemoryStore {
    async fn notify(&self, username: &str, event: PushEvent) -> Result<(), Error> {
        self.pushes
            .lock()
            .unwrap()
            .push((username.to_string(), event));
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn files_for(&self, external_id: &str) -> Result<Vec<FileRef>, Error> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn discharge_summary(&self, patient_external_id: &str) -> Result<FileRef, Error> {
        Ok(FileRef {
            name: format!("discharge-summary-{patient_external_id}.pdf"),
            read_url: format!(
                "https://blobs.invalid/discharge-summaries/{patient_external_id}.pdf"
            ),
        })
    }
}
