#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use hcx_mediator::crypto;
    use hcx_mediator::fhir::{ClaimUse, Outcome};
    use hcx_mediator::store::{ConsultationDiagnosis, ConsultationProcedure, EntityStore, FileRef};

    use crate::common::{
        claim, consultation, harness, inbound_token, line_item, policy, uuid, PAYOR_PRIVATE,
    };

    fn claim_response_bundle(claim_id: &str, outcome: &str, totals: &[f64], error: Option<&str>) -> Value {
        let mut response = json!({
            "resourceType": "ClaimResponse",
            "outcome": outcome,
            "total": totals
                .iter()
                .map(|value| json!({"amount": {"value": value, "currency": "INR"}}))
                .collect::<Vec<_>>(),
        });
        if let Some(display) = error {
            response["error"] = json!([{"code": {"coding": [{"display": display}]}}]);
        }
        json!({
            "resourceType": "Bundle",
            "id": claim_id,
            "type": "collection",
            "entry": [{"fullUrl": "ClaimResponse/r-1", "resource": response}]
        })
    }

    #[tokio::test]
    async fn preauth_rejection_lands_on_the_claim() {
        let h = harness().await;
        let c1 = uuid();
        let consultation_id = uuid();
        let p = policy(&uuid());
        h.store.insert_consultation(consultation(&consultation_id, &p.patient.external_id));
        h.store.insert_claim(claim(
            &c1,
            &consultation_id,
            p,
            ClaimUse::Preauthorization,
            vec![line_item("HBP-SG001A", "Appendicectomy, open", 16000.0)],
        ));

        h.mediator.make_claim(&c1, "doctor").await.unwrap();

        let operations = h.gateway.operations();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].0, "preauth/submit");

        let token = inbound_token(
            &claim_response_bundle(&c1, "error", &[], Some("member not covered")),
            &uuid(),
        );
        h.mediator
            .handle_claim_on_submit(&token, "preauth/on_submit")
            .await
            .unwrap();

        let updated = h.store.claim(&c1).await.unwrap();
        assert_eq!(updated.outcome, Some(Outcome::Error));
        assert_eq!(updated.error_text.as_deref(), Some("member not covered"));
        assert_eq!(updated.total_amount_approved, Some(0.0));

        let pushes = h.store.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1.from, "preauth/on_submit");
        assert_eq!(pushes[0].1.message, "failed");
    }

    #[tokio::test]
    async fn partial_approval_sums_the_adjudicated_total() {
        let h = harness().await;
        let c2 = uuid();
        let consultation_id = uuid();
        let p = policy(&uuid());
        h.store.insert_consultation(consultation(&consultation_id, &p.patient.external_id));
        h.store.insert_claim(claim(
            &c2,
            &consultation_id,
            p,
            ClaimUse::Claim,
            vec![
                line_item("HBP001", "Package A", 1000.0),
                line_item("HBP002", "Package B", 500.0),
            ],
        ));

        h.mediator.make_claim(&c2, "doctor").await.unwrap();
        assert_eq!(h.gateway.operations()[0].0, "claim/submit");

        let token = inbound_token(&claim_response_bundle(&c2, "partial", &[900.0], None), &uuid());
        h.mediator
            .handle_claim_on_submit(&token, "claim/on_submit")
            .await
            .unwrap();

        let updated = h.store.claim(&c2).await.unwrap();
        assert_eq!(updated.outcome, Some(Outcome::Partial));
        assert_eq!(updated.total_amount_approved, Some(900.0));
    }

    #[tokio::test]
    async fn replayed_callback_is_idempotent() {
        let h = harness().await;
        let c3 = uuid();
        let consultation_id = uuid();
        h.store.insert_consultation(consultation(&consultation_id, "patient-x"));
        h.store.insert_claim(claim(
            &c3,
            &consultation_id,
            policy(&uuid()),
            ClaimUse::Claim,
            vec![line_item("HBP001", "Package A", 1000.0)],
        ));

        let token = inbound_token(&claim_response_bundle(&c3, "complete", &[1000.0], None), &uuid());

        h.mediator
            .handle_claim_on_submit(&token, "claim/on_submit")
            .await
            .unwrap();
        let first = h.store.claim(&c3).await.unwrap();

        h.mediator
            .handle_claim_on_submit(&token, "claim/on_submit")
            .await
            .unwrap();
        let second = h.store.claim(&c3).await.unwrap();

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.total_amount_approved, second.total_amount_approved);
        assert_eq!(first.error_text, second.error_text);

        // one push per delivery, nothing beyond
        assert_eq!(h.store.pushes().len(), 2);
    }

    #[tokio::test]
    async fn make_claim_enriches_from_the_consultation() {
        let h = harness().await;
        let claim_id = uuid();
        let prior_id = uuid();
        let consultation_id = uuid();
        let p = policy(&uuid());

        let mut record = consultation(&consultation_id, &p.patient.external_id);
        record.procedures = vec![
            ConsultationProcedure {
                external_id: "proc-done".to_string(),
                name: "Appendicectomy".to_string(),
                scheduled_at: Some(Utc::now() - Duration::hours(2)),
            },
            ConsultationProcedure {
                external_id: "proc-planned".to_string(),
                name: "Physiotherapy".to_string(),
                scheduled_at: Some(Utc::now() + Duration::hours(2)),
            },
            ConsultationProcedure {
                external_id: "proc-open".to_string(),
                name: "Observation".to_string(),
                scheduled_at: None,
            },
        ];
        record.diagnoses = vec![
            ConsultationDiagnosis {
                external_id: "diag-1".to_string(),
                label: "K35.8 Acute appendicitis".to_string(),
                confirmed: true,
                is_principal: true,
            },
            ConsultationDiagnosis {
                external_id: "diag-2".to_string(),
                label: "E11 Type 2 diabetes".to_string(),
                confirmed: true,
                is_principal: false,
            },
            ConsultationDiagnosis {
                external_id: "diag-3".to_string(),
                label: "R50 Fever, suspected".to_string(),
                confirmed: false,
                is_principal: false,
            },
        ];
        h.store.insert_consultation(record);

        // an earlier claim on the same consultation becomes related: prior
        let mut prior = claim(
            &prior_id,
            &consultation_id,
            p.clone(),
            ClaimUse::Preauthorization,
            vec![],
        );
        prior.modified_at = Utc::now() - Duration::hours(1);
        h.store.insert_claim(prior);

        h.store.insert_claim(claim(
            &claim_id,
            &consultation_id,
            p,
            ClaimUse::Claim,
            vec![line_item("HBP-SG001A", "Appendicectomy, open", 16000.0)],
        ));

        h.store.attach_file(
            &consultation_id,
            FileRef {
                name: "lab-report.pdf".to_string(),
                read_url: "https://blobs.invalid/lab-report.pdf".to_string(),
            },
        );

        h.mediator.make_claim(&claim_id, "doctor").await.unwrap();

        let (_, token) = &h.gateway.operations()[0];
        let envelope = crypto::decrypt(PAYOR_PRIVATE, token).unwrap();
        let claim_resource = &envelope.payload["entry"][0]["resource"];

        // procedure statuses derived from scheduled time
        let statuses: Vec<(&str, &str)> = envelope.payload["entry"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| &e["resource"])
            .filter(|r| r["resourceType"] == "Procedure")
            .map(|r| (r["id"].as_str().unwrap(), r["status"].as_str().unwrap()))
            .collect();
        assert!(statuses.contains(&("proc-done", "completed")));
        assert!(statuses.contains(&("proc-planned", "preparation")));
        assert!(statuses.contains(&("proc-open", "in-progress")));

        // confirmed diagnoses only, labels split, principal flag kept
        let diagnosis = claim_resource["diagnosis"].as_array().unwrap();
        assert_eq!(diagnosis.len(), 2);
        assert_eq!(diagnosis[0]["type"][0]["coding"][0]["code"], "principal");
        assert_eq!(diagnosis[1]["type"][0]["coding"][0]["code"], "clinical");
        let conditions: Vec<&Value> = envelope.payload["entry"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| &e["resource"])
            .filter(|r| r["resourceType"] == "Condition")
            .collect();
        assert_eq!(conditions[0]["code"]["coding"][0]["code"], "K35.8");
        assert_eq!(conditions[0]["code"]["coding"][0]["display"], "Acute appendicitis");

        // the earlier claim is related as prior
        assert_eq!(claim_resource["related"][0]["claim"]["reference"], format!("Claim/{prior_id}"));
        assert_eq!(
            claim_resource["related"][0]["relationship"]["coding"][0]["code"],
            "prior"
        );

        // attached file as MB, discharge summary appended as DIA on final claims
        let supporting = claim_resource["supportingInfo"].as_array().unwrap();
        assert_eq!(supporting.len(), 2);
        assert_eq!(supporting[0]["category"]["coding"][0]["code"], "MB");
        assert_eq!(
            supporting[0]["valueAttachment"]["url"],
            "https://blobs.invalid/lab-report.pdf"
        );
        assert_eq!(supporting[1]["category"]["coding"][0]["code"], "DIA");
    }
}
