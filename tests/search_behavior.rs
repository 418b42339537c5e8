//! Behavior-driven tests for bilingual search
//!
//! These tests verify HOW the system finds securities by symbol, Thai name
//! or English name, and how the index follows listing changes.

mod support;

use std::sync::Arc;

use proptest::prelude::*;
use thaifin_core::search::EXACT_SCORE;
use thaifin_core::{SearchIndex, SearchSettings, SecurityIdentity, SourceErrorKind, Symbol};

use support::*;

// =============================================================================
// Search: Through the Router
// =============================================================================

#[tokio::test]
async fn when_thai_company_name_is_searched_system_finds_the_symbol() {
    // Given: JAS is listed with its Thai name
    let router = router(Arc::new(healthy_upstreams()));

    // When: The Thai name prefix is searched
    let hits = router.search("จัสมิน", 5).await.expect("search");

    // Then: JAS is the first hit
    assert_eq!(hits.first().map(|hit| hit.identity.symbol.as_str()), Some("JAS"));
    assert!(hits[0].score >= router.config().search.min_similarity);
}

#[tokio::test]
async fn when_exact_symbol_is_searched_system_ranks_it_first() {
    let router = router(Arc::new(healthy_upstreams()));

    let hits = router.search("ptt", 5).await.expect("search");

    assert_eq!(hits[0].identity.symbol.as_str(), "PTT");
    assert_eq!(hits[0].score, EXACT_SCORE);
    assert_eq!(hits[0].identity.sector.as_deref(), Some("Energy & Utilities"));
}

#[tokio::test]
async fn when_nothing_matches_system_returns_empty_results_not_an_error() {
    let router = router(Arc::new(healthy_upstreams()));

    let hits = router.search("zzz-nonexistent", 5).await.expect("search");

    assert!(hits.is_empty());
}

#[tokio::test]
async fn when_same_query_repeats_system_returns_identical_results() {
    // Given: A router over an unchanged listing
    let client = Arc::new(healthy_upstreams());
    let router = router(Arc::clone(&client));

    // When: The same query runs twice
    let first = router.search("jasmine", 5).await.expect("search");
    let second = router.search_default("jasmine").await.expect("search");

    // Then: Results match and the listing was fetched only once
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(client.calls(&listing_url()), 1);
}

#[tokio::test]
async fn when_limit_is_zero_system_returns_nothing() {
    let router = router(Arc::new(healthy_upstreams()));
    assert!(router.search("PTT", 0).await.expect("search").is_empty());
}

#[tokio::test]
async fn when_listing_is_unavailable_search_fails_with_listing_unavailable() {
    let client = Arc::new(healthy_upstreams().ok(listing_url(), EMPTY_LISTING));
    let router = router(client);

    let error = router.search("PTT", 5).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::ListingUnavailable);
}

// =============================================================================
// Search: Index Properties
// =============================================================================

fn identity(symbol: &str, thai: &str, english: &str) -> SecurityIdentity {
    SecurityIdentity::new(Symbol::parse(symbol).expect("valid"), thai, english)
}

fn universe() -> Vec<SecurityIdentity> {
    vec![
        identity("ADVANC", "แอดวานซ์ อินโฟร์ เซอร์วิส", "Advanced Info Service"),
        identity("AOT", "ท่าอากาศยานไทย", "Airports of Thailand"),
        identity("CPALL", "ซีพี ออลล์", "CP ALL"),
        identity("JAS", "จัสมิน อินเตอร์เนชั่นแนล", "Jasmine International"),
        identity("KBANK", "ธนาคารกสิกรไทย", "Kasikornbank"),
        identity("PTT", "ปตท.", "PTT Public Company Limited"),
        identity("PTTEP", "ปตท. สำรวจและผลิตปิโตรเลียม", "PTT Exploration and Production"),
    ]
}

#[test]
fn when_english_name_is_misspelled_system_still_ranks_the_closest_match_first() {
    let index = SearchIndex::from_identities(universe(), SearchSettings::default());

    let hits = index.search("Kasikorn bank", 3);

    assert_eq!(hits[0].identity.symbol.as_str(), "KBANK");
}

#[test]
fn when_scores_tie_system_orders_by_symbol() {
    let index = SearchIndex::from_identities(
        vec![
            identity("BBB", "", "Same Name"),
            identity("AAA", "", "Same Name"),
        ],
        SearchSettings::default(),
    );

    let hits = index.search("same name", 5);

    let symbols: Vec<&str> = hits.iter().map(|hit| hit.identity.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAA", "BBB"]);
}

proptest! {
    #[test]
    fn any_listed_symbol_is_an_exact_first_hit(position in 0usize..7, lowercase in any::<bool>()) {
        let universe = universe();
        let index = SearchIndex::from_identities(universe.clone(), SearchSettings::default());
        let symbol = universe[position].symbol.as_str();
        let query = if lowercase { symbol.to_ascii_lowercase() } else { symbol.to_owned() };

        let hits = index.search(&query, 5);

        prop_assert_eq!(hits[0].identity.symbol.as_str(), symbol);
        prop_assert_eq!(hits[0].score, EXACT_SCORE);
        prop_assert!(hits.len() <= 5);
        prop_assert!(hits.iter().skip(1).all(|hit| hit.score <= EXACT_SCORE));
    }
}
