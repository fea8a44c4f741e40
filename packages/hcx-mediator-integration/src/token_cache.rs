#[cfg(test)]
mod tests {
    use crate::common::harness;

    #[tokio::test]
    async fn bearer_is_cached_until_forced_expiry() {
        let h = harness().await;
        assert_eq!(h.gateway.auth_calls(), 0);

        let first = h.mediator.registry.token().await.unwrap();
        assert_eq!(h.gateway.auth_calls(), 1);

        // expires_in=3600 with a 60s margin: well within the window, the
        // cached bearer is returned and no request goes out
        let second = h.mediator.registry.token().await.unwrap();
        assert_eq!(second, first);
        assert_eq!(h.gateway.auth_calls(), 1);

        h.mediator.registry.invalidate_token();

        let third = h.mediator.registry.token().await.unwrap();
        assert_ne!(third, first);
        assert_eq!(h.gateway.auth_calls(), 2);
    }

    #[tokio::test]
    async fn searches_share_the_cached_bearer() {
        let h = harness().await;

        h.mediator.registry.search("roles", "payor").await.unwrap();
        h.mediator.registry.search("roles", "payor").await.unwrap();
        h.mediator
            .registry
            .search("participant_code", "1-test-payor")
            .await
            .unwrap();

        assert_eq!(h.gateway.auth_calls(), 1);
    }

    #[tokio::test]
    async fn payor_catalog_filters_to_active_matches() {
        let h = harness().await;

        let payors =
            hcx_mediator::catalogs::list_payors(&h.mediator.registry, Some("a")).await.unwrap();

        assert_eq!(payors.len(), 1);
        assert_eq!(payors[0].name, "Alpha Assurance");
        assert_eq!(payors[0].code, "1-alpha");
    }
}
