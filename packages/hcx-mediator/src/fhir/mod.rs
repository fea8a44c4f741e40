pub mod builder;
pub mod codes;
pub mod parse;
pub mod types;
pub mod validate;

pub use codes::{
    ClaimType, ClaimUse, DiagnosisType, Gender, Outcome, Priority, ProcedureStatus, Purpose,
    RelatedClaimRelation, Status,
};

/// Profile URLs mandated by the exchange implementation guide (v0.7.1)
/// and the national FHIR registry.
pub mod profiles {
    pub const PATIENT: &str = "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Patient";
    pub const ORGANIZATION: &str = "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Organization";
    pub const COVERAGE: &str = "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-Coverage.html";
    pub const COVERAGE_ELIGIBILITY_REQUEST: &str =
        "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-CoverageEligibilityRequest.html";
    pub const COVERAGE_ELIGIBILITY_REQUEST_BUNDLE: &str =
        "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-CoverageEligibilityRequestBundle.html";
    pub const CLAIM: &str = "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-Claim.html";
    pub const CLAIM_BUNDLE: &str =
        "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-ClaimRequestBundle.html";
    pub const COMMUNICATION: &str =
        "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-Communication.html";
    pub const COMMUNICATION_BUNDLE: &str =
        "https://ig.hcxprotocol.io/v0.7.1/StructureDefinition-CommunicationBundle.html";
}

/// Identifier systems and code systems stamped into outgoing resources.
pub mod systems {
    pub const CODES: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
    pub const PATIENT_IDENTIFIER: &str = "http://gicofIndia.com/beneficiaries";
    pub const PROVIDER_IDENTIFIER: &str = "http://abdm.gov.in/facilities";
    pub const INSURER_IDENTIFIER: &str = "http://irdai.gov.in/insurers";
    pub const COVERAGE_IDENTIFIER: &str = "https://www.gicofIndia.in/policies";
    pub const COVERAGE_RELATIONSHIP: &str =
        "http://terminology.hl7.org/CodeSystem/subscriber-relationship";
    pub const PRIORITY: &str = "http://terminology.hl7.org/CodeSystem/processpriority";
    pub const CLAIM_TYPE: &str = "http://terminology.hl7.org/CodeSystem/claim-type";
    pub const CLAIM_PAYEE_TYPE: &str = "http://terminology.hl7.org/CodeSystem/payeetype";
    pub const CLAIM_ITEM: &str = "https://pmjay.gov.in/hbp-package-code";
    pub const CLAIM_ITEM_CATEGORY: &str = "https://irdai.gov.in/benefit-billing-group-code";
    pub const CLAIM_ITEM_CATEGORY_PMJAY: &str = "https://pmjay.gov.in/benefit-billing-group-code";
    pub const CLAIM_SUPPORTING_INFO_CATEGORY: &str =
        "http://hcxprotocol.io/codes/claim-supporting-info-categories";
    pub const RELATED_CLAIM_RELATIONSHIP: &str =
        "http://terminology.hl7.org/CodeSystem/ex-relatedclaimrelationship";
    pub const DIAGNOSIS_TYPE: &str = "http://terminology.hl7.org/CodeSystem/ex-diagnosistype";
    pub const CONDITION: &str = "http://snomed.info/sct";
    pub const BUNDLE_IDENTIFIER: &str = "https://www.tmh.in/bundle";
    pub const COMMUNICATION_IDENTIFIER: &str = "http://www.providerco.com/communication";
}
