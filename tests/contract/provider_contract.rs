#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use thaifin_core::{
    DataSource, DividendAdapter, Endpoint, FactsheetAdapter, FinnomenaAdapter, ProviderId,
    SourceContext, SourceErrorKind, SourceRank, Symbol, ThaiSecuritiesAdapter,
};

use support::*;

#[derive(Clone)]
struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn DataSource>,
    supports_listing: bool,
    supports_classification: bool,
    supports_periods: bool,
    supports_dividends: bool,
}

fn provider_cases() -> Vec<ProviderCase> {
    let context = SourceContext::from_config(Arc::new(healthy_upstreams()), &test_config());
    vec![
        ProviderCase {
            id: ProviderId::Finnomena,
            source: Arc::new(FinnomenaAdapter::new(context.clone(), FINNOMENA, SourceRank(0))),
            supports_listing: true,
            supports_classification: false,
            supports_periods: true,
            supports_dividends: false,
        },
        ProviderCase {
            id: ProviderId::ThaiSecuritiesData,
            source: Arc::new(ThaiSecuritiesAdapter::new(context.clone(), SECURITIES)),
            supports_listing: false,
            supports_classification: true,
            supports_periods: false,
            supports_dividends: false,
        },
        ProviderCase {
            id: ProviderId::SetFactsheet,
            source: Arc::new(FactsheetAdapter::new(context.clone(), SET, SourceRank(1))),
            supports_listing: false,
            supports_classification: false,
            supports_periods: true,
            supports_dividends: false,
        },
        ProviderCase {
            id: ProviderId::SetDividend,
            source: Arc::new(DividendAdapter::new(context, SET, SourceRank(2))),
            supports_listing: false,
            supports_classification: false,
            supports_periods: true,
            supports_dividends: true,
        },
    ]
}

fn ptt() -> Symbol {
    Symbol::parse("PTT").expect("valid symbol")
}

#[test]
fn capabilities_match_declared_contract() {
    for case in provider_cases() {
        let capabilities = case.source.capabilities();
        assert_eq!(case.source.id(), case.id);
        assert_eq!(capabilities.supports(Endpoint::Listing), case.supports_listing, "provider '{}': listing", case.id);
        assert_eq!(
            capabilities.supports(Endpoint::Classification),
            case.supports_classification,
            "provider '{}': classification",
            case.id
        );
        assert_eq!(capabilities.supports(Endpoint::Periods), case.supports_periods, "provider '{}': periods", case.id);
        assert_eq!(
            capabilities.supports(Endpoint::Dividends),
            case.supports_dividends,
            "provider '{}': dividends",
            case.id
        );
    }
}

#[tokio::test]
async fn identity_endpoints_return_valid_identities() {
    for case in provider_cases()
        .into_iter()
        .filter(|case| case.supports_listing || case.supports_classification)
    {
        let batch = case
            .source
            .list_identities()
            .await
            .unwrap_or_else(|error| panic!("provider '{}' listing failed: {error}", case.id));

        assert_eq!(batch.identities.len(), 2, "provider '{}': identity count", case.id);
        assert!(batch.warnings.is_empty(), "provider '{}': warnings", case.id);
        for identity in &batch.identities {
            assert!(!identity.symbol.as_str().is_empty());
            assert!(!identity.english_name.is_empty(), "provider '{}': english name", case.id);
        }
    }
}

#[tokio::test]
async fn period_endpoints_tag_records_with_provider_and_rank() {
    for case in provider_cases().into_iter().filter(|case| case.supports_periods) {
        let batch = case
            .source
            .fetch_periods(&ptt())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' periods failed: {error}", case.id));

        assert!(!batch.records.is_empty(), "provider '{}': no records", case.id);
        for record in &batch.records {
            assert_eq!(record.provider, case.id);
            assert_eq!(record.symbol, ptt());
            assert_eq!(
                record.rank,
                SourceRank::from_order(&test_config().sources.priority, case.id),
                "provider '{}': rank",
                case.id
            );
        }
    }
}

#[tokio::test]
async fn unsupported_endpoints_return_unsupported_endpoint_error() {
    for case in provider_cases() {
        if !case.supports_listing && !case.supports_classification {
            let error = case.source.list_identities().await.expect_err("listing should fail");
            assert_eq!(error.kind(), SourceErrorKind::UnsupportedEndpoint, "provider '{}'", case.id);
        }
        if !case.supports_periods {
            let error = case.source.fetch_periods(&ptt()).await.expect_err("periods should fail");
            assert_eq!(error.kind(), SourceErrorKind::UnsupportedEndpoint, "provider '{}'", case.id);
        }
        if !case.supports_dividends {
            let error = case.source.fetch_dividends(&ptt()).await.expect_err("dividends should fail");
            assert_eq!(error.kind(), SourceErrorKind::UnsupportedEndpoint, "provider '{}'", case.id);
            assert!(!error.retryable());
        }
    }
}

#[tokio::test]
async fn unknown_symbol_is_not_found_for_every_period_source() {
    for case in provider_cases().into_iter().filter(|case| case.supports_periods) {
        let symbol = Symbol::parse("NOPE").expect("valid symbol");
        let error = case
            .source
            .fetch_periods(&symbol)
            .await
            .expect_err("unknown symbol should fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound, "provider '{}'", case.id);
        assert_eq!(error.provider(), Some(case.id));
    }
}
