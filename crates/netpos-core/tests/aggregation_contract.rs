//! Contract Test: Concurrent Aggregation
//!
//! Verifies "everything at once" resolution.
//!
//! Constraints verified:
//! - Independent kinds are resolved concurrently
//! - One kind failing or timing out never aborts the others
//! - Best-effort keeps every kind's value or error
//! - All-or-nothing fails the call on any failed kind
//! - An invalid location target only fails the location kind under best-effort
//! - Composite results are stamped when produced, not when cached
//! - The client address is extracted locally and normalized
//!
//! If this test fails, aggregation has become sequential, or a failure in
//! one kind is leaking into its siblings.

mod common;

use chrono::Utc;
use common::*;
use netpos_core::client::RequestMetadata;
use netpos_core::error::Error;
use netpos_core::kind::ResourceKind;
use netpos_core::{AggregationPolicy, ResolveRequest};
use std::sync::Arc;
use std::time::Duration;

fn healthy_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_body(ICANHAZIP, "203.0.113.5")
        .with_body(IPAPI_SELF, ipapi_body("203.0.113.5", "Freedonia"))
}

#[tokio::test]
async fn everything_resolves_under_either_policy() {
    let fetcher = Arc::new(healthy_fetcher());
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);
    let request = ResolveRequest::everything()
        .with_client(RequestMetadata::new().with_direct_address("::ffff:10.1.2.3"));

    for policy in [AggregationPolicy::BestEffort, AggregationPolicy::AllOrNothing] {
        let result = agg.resolve_all(&request, policy).await.unwrap();

        assert!(result.is_complete());
        assert_eq!(result.public_ip(), Some("203.0.113.5"));
        assert_eq!(result.client_address(), Some("10.1.2.3"));
        assert_eq!(
            result.location().and_then(|l| l.country.as_deref()),
            Some("Freedonia")
        );
        assert!(result.interfaces().is_some_and(|i| i.contains_key("lo")));
    }
}

#[tokio::test]
async fn best_effort_keeps_partial_results() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_body(ICANHAZIP, "203.0.113.5")
            .with_failure(IPAPI_SELF),
    );
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let request = ResolveRequest::new([ResourceKind::PublicIp, ResourceKind::Location]);
    let result = agg
        .resolve_all(&request, AggregationPolicy::BestEffort)
        .await
        .unwrap();

    assert!(!result.is_complete());
    assert_eq!(result.public_ip(), Some("203.0.113.5"));
    assert!(result.location().is_none());
    assert!(result.values().contains_key(&ResourceKind::Location));
    assert!(
        result
            .error(ResourceKind::Location)
            .is_some_and(|e| e.contains("location"))
    );
    assert!(result.error(ResourceKind::PublicIp).is_none());
    // Unrequested kinds are absent, not failed
    assert!(!result.values().contains_key(&ResourceKind::Interfaces));
}

#[tokio::test]
async fn all_or_nothing_fails_on_any_kind() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_body(ICANHAZIP, "203.0.113.5")
            .with_failure(IPAPI_SELF),
    );
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let request = ResolveRequest::new([ResourceKind::PublicIp, ResourceKind::Location]);
    let err = agg
        .resolve_all(&request, AggregationPolicy::AllOrNothing)
        .await
        .unwrap_err();

    match err {
        Error::AggregateFailed { kind, source } => {
            assert_eq!(kind, ResourceKind::Location);
            assert!(source.is_exhaustion());
        }
        other => panic!("expected aggregate failure, got {:?}", other),
    }
    // The sibling still ran to completion
    assert_eq!(fetcher.call_count(ICANHAZIP), 1);
}

#[tokio::test]
async fn interface_failure_is_isolated() {
    let fetcher = Arc::new(healthy_fetcher());
    let lister = Arc::new(StaticLister::failing());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let result = agg.status().await;

    assert_eq!(result.public_ip(), Some("203.0.113.5"));
    assert!(result.location().is_some());
    assert!(result.interfaces().is_none());
    assert!(result.error(ResourceKind::Interfaces).is_some());
    assert!(!result.values().contains_key(&ResourceKind::ClientAddress));
}

#[tokio::test(start_paused = true)]
async fn kinds_resolve_concurrently() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with(
                ICANHAZIP,
                Reply::Delayed(Duration::from_secs(1), b"203.0.113.5".to_vec()),
            )
            .with(
                IPAPI_SELF,
                Reply::Delayed(
                    Duration::from_secs(1),
                    ipapi_body("203.0.113.5", "Freedonia").into_bytes(),
                ),
            ),
    );
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let start = tokio::time::Instant::now();
    let result = agg
        .resolve_all(&ResolveRequest::everything(), AggregationPolicy::AllOrNothing)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.is_complete());
    assert!(elapsed >= Duration::from_secs(1));
    assert!(
        elapsed < Duration::from_millis(1500),
        "two 1s lookups took {:?}; they ran sequentially",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_in_one_kind_does_not_abort_siblings() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with(ICANHAZIP, Reply::Hang)
            .with_body(IPAPI_SELF, ipapi_body("203.0.113.5", "Freedonia")),
    );
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let result = agg
        .resolve_all(&ResolveRequest::everything(), AggregationPolicy::BestEffort)
        .await
        .unwrap();

    assert!(result.public_ip().is_none());
    assert!(result.error(ResourceKind::PublicIp).is_some());
    assert!(result.location().is_some());
    assert!(result.interfaces().is_some());
    assert_eq!(result.client_address(), Some("unknown"));
}

#[tokio::test]
async fn invalid_target_aborts_all_or_nothing_before_any_work() {
    let fetcher = Arc::new(healthy_fetcher());
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let request = ResolveRequest::everything().with_location_target("example.com");
    let err = agg
        .resolve_all(&request, AggregationPolicy::AllOrNothing)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidParameter(_)));
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(lister.call_count(), 0);
}

#[tokio::test]
async fn invalid_target_only_fails_location_under_best_effort() {
    let fetcher = Arc::new(healthy_fetcher());
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let request = ResolveRequest::everything()
        .with_location_target("example.com")
        .with_client(RequestMetadata::new().with_real_ip("198.51.100.7"));
    let result = agg
        .resolve_all(&request, AggregationPolicy::BestEffort)
        .await
        .unwrap();

    assert_eq!(result.requested().count(), 4);
    assert!(result.location().is_none());
    let reason = result.error(ResourceKind::Location).unwrap();
    assert!(reason.contains("example.com"), "{}", reason);

    assert!(result.public_ip().is_some());
    assert!(result.interfaces().is_some());
    assert_eq!(result.client_address(), Some("198.51.100.7"));

    assert_eq!(fetcher.call_count(ICANHAZIP), 1);
    assert!(
        fetcher.calls().iter().all(|url| !url.contains("ipapi")),
        "no location provider contacted"
    );
    assert_eq!(lister.call_count(), 1);
}

#[tokio::test]
async fn cached_values_get_a_fresh_production_time() {
    let fetcher = Arc::new(healthy_fetcher());
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);
    let request = ResolveRequest::new([ResourceKind::PublicIp]);

    let before = Utc::now();
    let first = agg
        .resolve_all(&request, AggregationPolicy::AllOrNothing)
        .await
        .unwrap();
    let second = agg
        .resolve_all(&request, AggregationPolicy::AllOrNothing)
        .await
        .unwrap();

    assert_eq!(fetcher.call_count(ICANHAZIP), 1, "second call served from cache");
    assert!(first.produced_at() >= before);
    assert!(second.produced_at() >= first.produced_at());
}

#[tokio::test]
async fn client_address_follows_header_precedence() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let lister = Arc::new(StaticLister::new());
    let agg = aggregator(config_with(&["icanhazip"], &["ipapi"]), &fetcher, &lister);

    let proxied = RequestMetadata::new()
        .with_forwarded_for(" 203.0.113.195 , 70.41.3.18")
        .with_real_ip("10.0.0.1");
    assert_eq!(agg.client_address(&proxied), "203.0.113.195");

    let real_ip_only = RequestMetadata::new().with_forwarded_for("  ").with_real_ip("::1");
    assert_eq!(agg.client_address(&real_ip_only), "127.0.0.1");

    assert_eq!(agg.client_address(&RequestMetadata::new()), "unknown");

    let request = ResolveRequest::new([ResourceKind::ClientAddress]).with_client(proxied);
    let result = agg
        .resolve_all(&request, AggregationPolicy::AllOrNothing)
        .await
        .unwrap();
    assert_eq!(result.client_address(), Some("203.0.113.195"));
    assert_eq!(fetcher.total_calls(), 0, "client extraction never touches the network");
}

#[tokio::test]
async fn duplicate_kinds_resolve_once() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_body(ICANHAZIP, "203.0.113.5"));
    let lister = Arc::new(StaticLister::new());
    let config = config_with(&["icanhazip"], &["ipapi"]).with_cache_enabled(false);
    let agg = aggregator(config, &fetcher, &lister);

    let request = ResolveRequest::new([ResourceKind::PublicIp, ResourceKind::PublicIp]);
    let result = agg
        .resolve_all(&request, AggregationPolicy::BestEffort)
        .await
        .unwrap();

    assert_eq!(result.requested().count(), 1);
    assert_eq!(fetcher.call_count(ICANHAZIP), 1);
}
