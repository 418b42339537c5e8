//! Behavior-driven tests for upstream failures
//!
//! These tests verify HOW the system classifies and retries failures:
//! bounded attempts with backoff for transient errors, a single attempt for
//! permanent ones, and a cache that never stores a failure.

mod support;

use std::sync::Arc;
use std::time::Duration;

use thaifin_core::{
    CacheMode, CoreError, HttpError, HttpResponse, ProviderId, SourceErrorKind, ThaifinConfig,
};
use tokio::time::Instant;

use support::*;

// =============================================================================
// Retry: Transient Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_upstream_times_out_every_time_system_gives_up_after_three_attempts() {
    // Given: The stock list times out on every attempt
    let client = Arc::new(
        healthy_upstreams().route(listing_url(), vec![Err(HttpError::timeout("read timed out"))]),
    );
    let router = router(Arc::clone(&client));
    let started = Instant::now();

    // When: Fundamentals are requested
    let error = router.fundamentals("PTT").await.expect_err("must fail");

    // Then: Exactly three attempts were made, separated by backoff delays
    assert_eq!(client.calls(&listing_url()), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(8));

    // And: The failure surfaces as transient and names the provider
    assert_eq!(error.kind(), SourceErrorKind::Transient);
    assert!(error.retryable());
    assert_eq!(error.provider(), Some(ProviderId::Finnomena));
}

#[tokio::test(start_paused = true)]
async fn when_upstream_recovers_within_budget_system_succeeds() {
    // Given: The stock list fails to connect once, then answers
    let client = Arc::new(healthy_upstreams().route(
        listing_url(),
        vec![Err(HttpError::connect("connection refused")), Ok(HttpResponse::ok(LISTING))],
    ));
    let router = router(Arc::clone(&client));

    // When: The universe is listed
    let listing = router.list_identities().await.expect("recovered");

    // Then: The second attempt's data is returned
    assert_eq!(listing.data.len(), 2);
    assert_eq!(client.calls(&listing_url()), 2);
}

#[tokio::test(start_paused = true)]
async fn when_failures_differ_between_attempts_system_returns_the_last_one() {
    // Given: The summary times out twice, then answers 503
    let client = Arc::new(healthy_upstreams().route(
        summary_url(PTT_ID),
        vec![
            Err(HttpError::timeout("read timed out")),
            Err(HttpError::timeout("read timed out")),
            Ok(HttpResponse::new(503, "")),
        ],
    ));
    let router = router(Arc::clone(&client));

    // When: Fundamentals are requested
    let error = router.fundamentals("PTT").await.expect_err("must fail");

    // Then: The third attempt's 503 is surfaced, not the earlier timeouts
    assert_eq!(client.calls(&summary_url(PTT_ID)), 3);
    assert_eq!(error.kind(), SourceErrorKind::Transient);
    assert!(error.message().contains("returned 503"), "{}", error.message());
    assert!(!error.message().contains("timed out"), "{}", error.message());
    assert_eq!(error.provider(), Some(ProviderId::Finnomena));
}

#[tokio::test(start_paused = true)]
async fn when_payload_is_malformed_system_retries_it_as_transient() {
    let client = Arc::new(healthy_upstreams().ok(summary_url(PTT_ID), "<html>maintenance</html>"));
    let router = router(Arc::clone(&client));

    let error = router.fundamentals("PTT").await.expect_err("must fail");

    assert_eq!(error.kind(), SourceErrorKind::Transient);
    assert_eq!(client.calls(&summary_url(PTT_ID)), 3);
}

// =============================================================================
// Retry: Permanent Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_upstream_answers_404_system_does_not_retry() {
    // Given: Finnomena has no summary for JAS (unscripted URLs answer 404)
    let client = Arc::new(healthy_upstreams());
    let router = router(Arc::clone(&client));
    let started = Instant::now();

    // When: Fundamentals are requested
    let error = router.fundamentals("JAS").await.expect_err("must fail");

    // Then: One attempt, no delay, NotFound
    assert_eq!(client.calls(&summary_url(JAS_ID)), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(error.kind(), SourceErrorKind::NotFound);
    assert!(!error.retryable());
}

#[tokio::test]
async fn when_transport_error_is_not_retryable_system_fails_fast() {
    let client = Arc::new(healthy_upstreams().route(
        listing_url(),
        vec![Err(HttpError::non_retryable("invalid url"))],
    ));
    let router = router(Arc::clone(&client));

    let error = router.fundamentals("PTT").await.expect_err("must fail");

    assert_eq!(client.calls(&listing_url()), 1);
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
}

#[tokio::test]
async fn when_symbol_is_malformed_system_rejects_it_before_any_request() {
    let client = Arc::new(healthy_upstreams());
    let router = router(Arc::clone(&client));

    let error = router.fundamentals("PTT;DROP").await.expect_err("must fail");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert_eq!(client.total_calls(), 0);
}

// =============================================================================
// Cache: Failures Are Never Stored
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_fetch_fails_system_does_not_cache_the_failure() {
    // Given: The summary fails three times, then recovers
    let client = Arc::new(healthy_upstreams().route(
        summary_url(PTT_ID),
        vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::ok(PTT_SUMMARY)),
        ],
    ));
    let router = router(Arc::clone(&client));

    // When: The first call exhausts its retries
    let error = router.fundamentals("PTT").await.expect_err("first call fails");
    assert_eq!(error.kind(), SourceErrorKind::Transient);

    // Then: A later call reaches the upstream again and succeeds
    let result = router.fundamentals("PTT").await.expect("second call succeeds");
    assert_eq!(client.calls(&summary_url(PTT_ID)), 4);
    assert_eq!(result.data.quarterly[0].get("revenue"), Some(228_000.0));
}

#[tokio::test]
async fn when_cache_is_bypassed_system_contacts_upstream_every_time() {
    let mut config = test_config();
    config.cache.mode = CacheMode::Bypass;
    let client = Arc::new(healthy_upstreams());
    let router = router_with(Arc::clone(&client), config);

    router.fundamentals("PTT").await.expect("first");
    router.fundamentals("PTT").await.expect("second");

    assert_eq!(client.calls(&summary_url(PTT_ID)), 2);
    assert_eq!(client.calls(&factsheet_url("PTT")), 2);
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn when_config_is_inconsistent_system_rejects_it() {
    let error = ThaifinConfig::from_toml_str(
        r#"
        [retry]
        min_delay_secs = 30
        max_delay_secs = 10
        "#,
    )
    .expect_err("must fail");
    assert!(matches!(error, CoreError::Config(_)));

    let error = ThaifinConfig::default()
        .with_overrides_from(|name| {
            (name == "THAIFIN_SOURCE_PRIORITY").then(|| "finnomena,bloomberg".to_owned())
        })
        .expect_err("unknown provider");
    assert!(matches!(error, CoreError::Validation(_)));
}
