#[cfg(test)]
mod tests {
    use serde_json::json;

    use hcx_mediator::crypto;
    use hcx_mediator::fhir::builder::{
        eligibility_check_bundle, HospitalDescriptor, InsurerDescriptor, PatientDescriptor,
        PolicyDescriptor,
    };
    use hcx_mediator::fhir::{Gender, Priority, Purpose};
    use hcx_mediator::Operation;

    use crate::common::{harness, PAYOR_CODE, PAYOR_PRIVATE, PROVIDER_CODE};

    #[tokio::test]
    async fn dispatched_token_decrypts_to_the_supplied_bundle_and_headers() {
        let h = harness().await;

        let bundle = eligibility_check_bundle(
            "pol-ext-9",
            &HospitalDescriptor {
                id: "f-1".to_string(),
                name: "General Hospital".to_string(),
                facility_id: "IN0001".to_string(),
            },
            &InsurerDescriptor {
                code: PAYOR_CODE.to_string(),
                name: "Test Payor".to_string(),
            },
            &PatientDescriptor {
                id: "p-1".to_string(),
                name: "Ravi Kumar".to_string(),
                gender: Gender::Male,
            },
            &PolicyDescriptor {
                subscriber_id: "SUB-1".to_string(),
                policy_id: "POL-1".to_string(),
            },
            Priority::Normal,
            Purpose::Validation,
        );

        let dispatch = h
            .mediator
            .dispatcher
            .send(
                &bundle,
                Operation::CoverageEligibilityCheck,
                PAYOR_CODE,
                Some("corr-42"),
            )
            .await
            .unwrap();

        assert_eq!(dispatch.ack, json!({ "status": "accepted" }));

        // what the stub received is exactly what send() returned
        let operations = h.gateway.operations();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].1, dispatch.token);

        // and it opens back into the supplied bundle and headers
        let envelope = crypto::decrypt(PAYOR_PRIVATE, &dispatch.token).unwrap();
        assert_eq!(envelope.payload, serde_json::to_value(&bundle).unwrap());
        assert_eq!(envelope.headers["alg"], "RSA-OAEP");
        assert_eq!(envelope.headers["enc"], "A256GCM");
        assert_eq!(envelope.headers["x-hcx-sender_code"], PROVIDER_CODE);
        assert_eq!(envelope.headers["x-hcx-recipient_code"], PAYOR_CODE);
        assert_eq!(envelope.headers["x-hcx-correlation_id"], "corr-42");
        assert!(envelope.headers["x-hcx-api_call_id"].is_string());
    }

    #[tokio::test]
    async fn each_dispatch_mints_a_fresh_api_call_id() {
        let h = harness().await;

        let bundle = eligibility_check_bundle(
            "pol-ext-10",
            &HospitalDescriptor {
                id: "f-1".to_string(),
                name: "General Hospital".to_string(),
                facility_id: "IN0001".to_string(),
            },
            &InsurerDescriptor {
                code: PAYOR_CODE.to_string(),
                name: "Test Payor".to_string(),
            },
            &PatientDescriptor {
                id: "p-1".to_string(),
                name: "Ravi Kumar".to_string(),
                gender: Gender::Female,
            },
            &PolicyDescriptor {
                subscriber_id: "SUB-2".to_string(),
                policy_id: "POL-2".to_string(),
            },
            Priority::Normal,
            Purpose::Validation,
        );

        let first = h
            .mediator
            .dispatcher
            .send(&bundle, Operation::CoverageEligibilityCheck, PAYOR_CODE, None)
            .await
            .unwrap();
        let second = h
            .mediator
            .dispatcher
            .send(&bundle, Operation::CoverageEligibilityCheck, PAYOR_CODE, None)
            .await
            .unwrap();

        let a = crypto::decrypt(PAYOR_PRIVATE, &first.token).unwrap();
        let b = crypto::decrypt(PAYOR_PRIVATE, &second.token).unwrap();

        assert_ne!(a.headers["x-hcx-api_call_id"], b.headers["x-hcx-api_call_id"]);
        assert_ne!(
            a.headers["x-hcx-correlation_id"],
            b.headers["x-hcx-correlation_id"]
        );
    }
}
