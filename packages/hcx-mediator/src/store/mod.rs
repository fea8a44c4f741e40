//! Seams to the surrounding application.
//!
//! The mediator owns the protocol state machine and nothing else; entity
//! data, push delivery and blob access are all borrowed through these
//! traits. Outcome writes are single-statement updates — the store is
//! expected to provide read-your-writes per row, and the handlers rely on
//! the later write winning when duplicate callbacks race.

pub mod memory;
mod records;

pub use records::*;

use async_trait::async_trait;

use crate::error::Error;
use crate::fhir::Outcome;

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn policy(&self, external_id: &str) -> Result<PolicyRecord, Error>;

    async fn claim(&self, external_id: &str) -> Result<ClaimRecord, Error>;

    async fn consultation(&self, external_id: &str) -> Result<ConsultationRecord, Error>;

    async fn communication(&self, external_id: &str) -> Result<CommunicationRecord, Error>;

    async fn set_policy_outcome(
        &self,
        external_id: &str,
        outcome: Outcome,
        error_text: &str,
    ) -> Result<(), Error>;

    async fn set_claim_outcome(
        &self,
        external_id: &str,
        outcome: Outcome,
        total_amount_approved: f64,
        error_text: &str,
    ) -> Result<(), Error>;

    /// Persist an inbound communication. The row carries the gateway's
    /// identifier verbatim and no `created_by`.
    async fn create_communication(
        &self,
        new: NewCommunication,
    ) -> Result<CommunicationRecord, Error>;

    /// Claims on the same consultation, most recently modified first,
    /// excluding `except_claim_id`.
    async fn prior_claims(
        &self,
        consultation_id: &str,
        except_claim_id: &str,
    ) -> Result<Vec<ClaimRecord>, Error>;

    /// The earliest creator-less communication on a claim — i.e. the
    /// first message the payor sent, whose identifier is the correlation
    /// id for every response on this thread.
    async fn earliest_inbound_communication(
        &self,
        claim_id: &str,
    ) -> Result<Option<CommunicationRecord>, Error>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, username: &str, event: PushEvent) -> Result<(), Error>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Files associated with an entity, each with a pre-signed read URL.
    async fn files_for(&self, external_id: &str) -> Result<Vec<FileRef>, Error>;

    /// Generate (or fetch) the patient's discharge summary PDF.
    async fn discharge_summary(&self, patient_external_id: &str) -> Result<FileRef, Error>;
}
