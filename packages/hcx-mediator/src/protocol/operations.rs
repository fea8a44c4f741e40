use std::fmt::Display;

/// The gateway's protocol operations. Each maps to a fixed path segment
/// under the protocol base URL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    CoverageEligibilityCheck,
    CoverageEligibilityOnCheck,
    PreauthSubmit,
    PreauthOnSubmit,
    ClaimSubmit,
    ClaimOnSubmit,
    PaymentNoticeRequest,
    PaymentNoticeOnRequest,
    HcxStatus,
    HcxOnStatus,
    CommunicationRequest,
    CommunicationOnRequest,
    PredeterminationSubmit,
    PredeterminationOnSubmit,
}

impl Operation {
    pub fn path(&self) -> &'static str {
        match self {
            Operation::CoverageEligibilityCheck => "coverageeligibility/check",
            Operation::CoverageEligibilityOnCheck => "coverageeligibility/on_check",
            Operation::PreauthSubmit => "preauth/submit",
            Operation::PreauthOnSubmit => "preauth/on_submit",
            Operation::ClaimSubmit => "claim/submit",
            Operation::ClaimOnSubmit => "claim/on_submit",
            Operation::PaymentNoticeRequest => "paymentnotice/request",
            Operation::PaymentNoticeOnRequest => "paymentnotice/on_request",
            Operation::HcxStatus => "hcx/status",
            Operation::HcxOnStatus => "hcx/on_status",
            Operation::CommunicationRequest => "communication/request",
            Operation::CommunicationOnRequest => "communication/on_request",
            Operation::PredeterminationSubmit => "predetermination/submit",
            Operation::PredeterminationOnSubmit => "predetermination/on_submit",
        }
    }

    /// Response legs carry the correlation id of the request they answer.
    pub fn is_response_leg(&self) -> bool {
        matches!(
            self,
            Operation::CoverageEligibilityOnCheck
                | Operation::PreauthOnSubmit
                | Operation::ClaimOnSubmit
                | Operation::PaymentNoticeOnRequest
                | Operation::HcxOnStatus
                | Operation::CommunicationOnRequest
                | Operation::PredeterminationOnSubmit
        )
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
