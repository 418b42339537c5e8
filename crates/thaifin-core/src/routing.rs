use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::adapters::{
    DividendAdapter, FactsheetAdapter, FinnomenaAdapter, SourceContext, ThaiSecuritiesAdapter,
};
use crate::config::ThaifinConfig;
use crate::data_source::{DataSource, Endpoint, RecordWarning, SourceError};
use crate::frame::Frame;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::merge::merge;
use crate::normalize::normalize_all;
use crate::search::{SearchHit, SearchIndex};
use crate::{
    CoreError, DividendRecord, FinancialPeriodRecord, Granularity, ProviderId, SecurityIdentity,
    SourceRank, Symbol,
};

/// A source that failed during a multi-source call.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub provider: ProviderId,
    pub error: SourceError,
}

/// Which sources contributed to a result and which failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coverage {
    /// Providers that supplied data, in priority order.
    pub contributed: Vec<ProviderId>,
    pub failed: Vec<SourceFailure>,
}

impl Coverage {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Successful routed call.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub coverage: Coverage,
    pub warnings: Vec<RecordWarning>,
    pub latency_ms: u64,
}

/// Merged fundamentals of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Fundamentals {
    pub symbol: Symbol,
    pub quarterly: Vec<FinancialPeriodRecord>,
    pub yearly: Vec<FinancialPeriodRecord>,
}

impl Fundamentals {
    pub fn quarter_frame(&self) -> Frame {
        Frame::from_records(Granularity::Quarterly, &self.quarterly)
    }

    pub fn yearly_frame(&self) -> Frame {
        Frame::from_records(Granularity::Yearly, &self.yearly)
    }
}

struct IndexSnapshot {
    fingerprint: u64,
    index: Arc<SearchIndex>,
}

/// Adapter registry and routing engine.
///
/// The listing source is required: when it fails, every operation that needs
/// the security universe fails with `ListingUnavailable`. Classification
/// sources only enrich identities. Period sources are merged by rank; a failure
/// of a source named in `required` fails the call, any other failure is
/// reported in [`Coverage::failed`].
pub struct SourceRouter {
    listing: Option<Arc<dyn DataSource>>,
    classification: Vec<Arc<dyn DataSource>>,
    periods: Vec<Arc<dyn DataSource>>,
    dividends: Option<Arc<dyn DataSource>>,
    priority: Vec<ProviderId>,
    required: Vec<ProviderId>,
    config: ThaifinConfig,
    index: Mutex<Option<IndexSnapshot>>,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn fingerprint(identities: &[SecurityIdentity]) -> u64 {
    let mut hasher = DefaultHasher::new();
    identities.hash(&mut hasher);
    hasher.finish()
}

impl SourceRouter {
    /// Routes over `adapters` with the priority and search settings of `config`.
    pub fn new(adapters: Vec<Arc<dyn DataSource>>, config: ThaifinConfig) -> Self {
        let priority = config.sources.priority.clone();
        let rank = |adapter: &Arc<dyn DataSource>| SourceRank::from_order(&priority, adapter.id());

        let mut adapters = adapters;
        adapters.sort_by_key(|adapter| rank(adapter));

        let listing = adapters
            .iter()
            .find(|adapter| adapter.capabilities().listing)
            .cloned();
        let dividends = adapters
            .iter()
            .find(|adapter| adapter.capabilities().dividends)
            .cloned();
        let classification = adapters
            .iter()
            .filter(|adapter| adapter.capabilities().classification)
            .cloned()
            .collect();
        let periods = adapters
            .iter()
            .filter(|adapter| adapter.capabilities().periods)
            .cloned()
            .collect();

        Self {
            listing,
            classification,
            periods,
            dividends,
            required: config.sources.required.clone(),
            priority,
            config,
            index: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ThaifinConfig {
        &self.config
    }

    /// Period sources in merge order.
    pub fn period_chain(&self) -> Vec<ProviderId> {
        self.periods.iter().map(|adapter| adapter.id()).collect()
    }

    /// Every listed security, sorted by symbol, with classification where available.
    ///
    /// # Errors
    ///
    /// `ListingUnavailable` when the listing source cannot enumerate the universe.
    pub async fn list_identities(&self) -> Result<RouteSuccess<Vec<SecurityIdentity>>, SourceError> {
        let started = Instant::now();
        let Some(listing) = &self.listing else {
            return Err(SourceError::listing_unavailable(
                "no listing source is registered",
            ));
        };

        let batch = listing
            .list_identities()
            .await
            .map_err(|error| error.with_provider(listing.id()).into_listing_unavailable())?;
        let mut warnings = batch.warnings;
        let mut coverage = Coverage {
            contributed: vec![listing.id()],
            failed: Vec::new(),
        };

        let mut identities: BTreeMap<Symbol, SecurityIdentity> = BTreeMap::new();
        for identity in batch.identities {
            identities.entry(identity.symbol.clone()).or_insert(identity);
        }
        if identities.is_empty() {
            return Err(SourceError::listing_unavailable("listing returned no usable securities")
                .with_provider(listing.id()));
        }

        for source in &self.classification {
            match source.list_identities().await {
                Ok(batch) => {
                    let mut enriched = 0_usize;
                    for extra in batch.identities {
                        if let Some(identity) = identities.get_mut(&extra.symbol) {
                            identity.sector = identity.sector.take().or(extra.sector);
                            identity.industry = identity.industry.take().or(extra.industry);
                            identity.market = identity.market.take().or(extra.market);
                            enriched += 1;
                        }
                    }
                    tracing::info!(provider = %source.id(), enriched, "classification merged into listing");
                    warnings.extend(batch.warnings);
                    coverage.contributed.push(source.id());
                }
                Err(error) => {
                    let error = error.with_provider(source.id());
                    warnings.push(RecordWarning::new(
                        source.id(),
                        None,
                        format!("classification unavailable: {error}"),
                    ));
                    coverage.failed.push(SourceFailure {
                        provider: source.id(),
                        error,
                    });
                }
            }
        }

        Ok(RouteSuccess {
            data: identities.into_values().collect(),
            coverage,
            warnings,
            latency_ms: elapsed_ms(started),
        })
    }

    pub async fn list_symbols(&self) -> Result<Vec<Symbol>, SourceError> {
        let listing = self.list_identities().await?;
        Ok(listing
            .data
            .into_iter()
            .map(|identity| identity.symbol)
            .collect())
    }

    /// Identity with exactly this symbol.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a malformed symbol, `NotFound` when it is not listed.
    pub async fn find(&self, symbol: &str) -> Result<SecurityIdentity, SourceError> {
        let symbol = parse_symbol(symbol)?;
        let index = self.index().await?;
        index
            .get(symbol.as_str())
            .cloned()
            .ok_or_else(|| SourceError::not_found(format!("symbol '{symbol}' is not listed")))
    }

    /// Ranked matches for a symbol or company name in Thai or English.
    ///
    /// No match is an empty vector. Fails only when the listing is unavailable.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SourceError> {
        let index = self.index().await?;
        Ok(index.search(query, limit))
    }

    /// [`SourceRouter::search`] with the configured default limit.
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchHit>, SourceError> {
        self.search(query, self.config.search.default_limit).await
    }

    /// Search index of the current listing snapshot, rebuilt when the snapshot changes.
    async fn index(&self) -> Result<Arc<SearchIndex>, SourceError> {
        let identities = self.list_identities().await?.data;
        let fingerprint = fingerprint(&identities);

        let mut snapshot = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = snapshot.as_ref().filter(|current| current.fingerprint == fingerprint) {
            return Ok(Arc::clone(&current.index));
        }

        let index = Arc::new(SearchIndex::from_identities(
            identities,
            self.config.search.clone(),
        ));
        *snapshot = Some(IndexSnapshot {
            fingerprint,
            index: Arc::clone(&index),
        });
        Ok(index)
    }

    /// Merged quarterly and yearly records of `symbol` across every period source.
    ///
    /// # Errors
    ///
    /// The error of a required source, or the first error when no source succeeded.
    pub async fn fundamentals(&self, symbol: &str) -> Result<RouteSuccess<Fundamentals>, SourceError> {
        let started = Instant::now();
        let symbol = parse_symbol(symbol)?;

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut failed = Vec::new();
        let mut succeeded = 0_usize;

        for source in &self.periods {
            let provider = source.id();
            match source.fetch_periods(&symbol).await {
                Ok(batch) => {
                    succeeded += 1;
                    records.extend(normalize_all(batch.records));
                    warnings.extend(batch.warnings);
                }
                Err(error) => {
                    let error = error.with_provider(provider);
                    if self.required.contains(&provider) {
                        return Err(error);
                    }
                    tracing::warn!(provider = %provider, symbol = %symbol, error = %error, "optional source failed");
                    failed.push(SourceFailure { provider, error });
                }
            }
        }

        if succeeded == 0 {
            return Err(match failed.into_iter().next() {
                Some(failure) => failure.error,
                None => SourceError::unsupported_endpoint(Endpoint::Periods),
            });
        }

        let merged = merge(records);
        let mut contributed: Vec<ProviderId> = merged.contributors.iter().copied().collect();
        contributed.sort_by_key(|provider| SourceRank::from_order(&self.priority, *provider));
        tracing::info!(
            symbol = %symbol,
            quarterly = merged.quarterly.len(),
            yearly = merged.yearly.len(),
            contributed = contributed.len(),
            failed = failed.len(),
            "fundamentals merged"
        );

        Ok(RouteSuccess {
            data: Fundamentals {
                symbol,
                quarterly: merged.quarterly,
                yearly: merged.yearly,
            },
            coverage: Coverage { contributed, failed },
            warnings,
            latency_ms: elapsed_ms(started),
        })
    }

    /// Dividend history of `symbol`, oldest operation period first.
    pub async fn dividends(&self, symbol: &str) -> Result<RouteSuccess<Vec<DividendRecord>>, SourceError> {
        let started = Instant::now();
        let symbol = parse_symbol(symbol)?;
        let Some(source) = &self.dividends else {
            return Err(SourceError::unsupported_endpoint(Endpoint::Dividends));
        };

        let batch = source
            .fetch_dividends(&symbol)
            .await
            .map_err(|error| error.with_provider(source.id()))?;
        let mut dividends = batch.dividends;
        dividends.sort_by_key(|dividend| (dividend.period_end, dividend.xd_date));

        Ok(RouteSuccess {
            data: dividends,
            coverage: Coverage {
                contributed: vec![source.id()],
                failed: Vec::new(),
            },
            warnings: batch.warnings,
            latency_ms: elapsed_ms(started),
        })
    }

    pub async fn quarter_frame(&self, symbol: &str) -> Result<Frame, SourceError> {
        Ok(self.fundamentals(symbol).await?.data.quarter_frame())
    }

    pub async fn yearly_frame(&self, symbol: &str) -> Result<Frame, SourceError> {
        Ok(self.fundamentals(symbol).await?.data.yearly_frame())
    }
}

fn parse_symbol(raw: &str) -> Result<Symbol, SourceError> {
    Symbol::parse(raw).map_err(|error| SourceError::invalid_request(error.to_string()))
}

/// Builder wiring the four providers over one shared cache and fetcher.
///
/// # Example
///
/// ```rust,ignore
/// use thaifin_core::SourceRouterBuilder;
///
/// let router = SourceRouterBuilder::from_env()?.build();
/// let hits = router.search("จัสมิน", 5).await?;
/// ```
#[derive(Default)]
pub struct SourceRouterBuilder {
    config: ThaifinConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    disabled: Vec<ProviderId>,
}

impl SourceRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config with `THAIFIN_*` environment overrides applied.
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Self::new().with_config(ThaifinConfig::default().with_env_overrides()?))
    }

    /// Config loaded from a TOML file, then environment overrides.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let config = ThaifinConfig::from_file(path)?.with_env_overrides()?;
        Ok(Self::new().with_config(config))
    }

    pub fn with_config(mut self, config: ThaifinConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport used by every adapter. Defaults to [`ReqwestHttpClient`].
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Leaves `provider` out of the router.
    pub fn without(mut self, provider: ProviderId) -> Self {
        self.disabled.push(provider);
        self
    }

    pub fn build(self) -> SourceRouter {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let context = SourceContext::from_config(http_client, &self.config);
        let sources = &self.config.sources;
        let rank = |provider| SourceRank::from_order(&sources.priority, provider);

        let adapters: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(FinnomenaAdapter::new(
                context.clone(),
                &sources.finnomena_url,
                rank(ProviderId::Finnomena),
            )),
            Arc::new(ThaiSecuritiesAdapter::new(
                context.clone(),
                &sources.thai_securities_url,
            )),
            Arc::new(FactsheetAdapter::new(
                context.clone(),
                &sources.set_url,
                rank(ProviderId::SetFactsheet),
            )),
            Arc::new(DividendAdapter::new(
                context,
                &sources.set_url,
                rank(ProviderId::SetDividend),
            )),
        ];

        let adapters = adapters
            .into_iter()
            .filter(|adapter| !self.disabled.contains(&adapter.id()))
            .collect();
        SourceRouter::new(adapters, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{CapabilitySet, IdentityBatch, PeriodBatch, SourceFuture};
    use crate::{FiscalPeriod, RawSourceRecord};

    struct StaticSource {
        id: ProviderId,
        capabilities: CapabilitySet,
        identities: Vec<SecurityIdentity>,
        periods: Result<Vec<RawSourceRecord>, SourceError>,
    }

    impl DataSource for StaticSource {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn capabilities(&self) -> CapabilitySet {
            self.capabilities
        }

        fn list_identities<'a>(&'a self) -> SourceFuture<'a, IdentityBatch> {
            Box::pin(async move {
                Ok(IdentityBatch {
                    identities: self.identities.clone(),
                    warnings: Vec::new(),
                })
            })
        }

        fn fetch_periods<'a>(&'a self, _symbol: &'a Symbol) -> SourceFuture<'a, PeriodBatch> {
            Box::pin(async move {
                self.periods.clone().map(|records| PeriodBatch {
                    records,
                    warnings: Vec::new(),
                })
            })
        }
    }

    fn ptt() -> Symbol {
        Symbol::parse("PTT").expect("valid")
    }

    fn listing() -> Arc<dyn DataSource> {
        Arc::new(StaticSource {
            id: ProviderId::Finnomena,
            capabilities: CapabilitySet::new(true, false, true, false),
            identities: vec![SecurityIdentity::new(ptt(), "ปตท.", "PTT Public Company Limited")],
            periods: Ok(vec![RawSourceRecord::new(
                ProviderId::Finnomena,
                SourceRank(0),
                ptt(),
                FiscalPeriod::yearly(2020).expect("valid"),
            )
            .with_field("revenue", Some(1.0))]),
        })
    }

    fn failing_factsheet() -> Arc<dyn DataSource> {
        Arc::new(StaticSource {
            id: ProviderId::SetFactsheet,
            capabilities: CapabilitySet::new(false, false, true, false),
            identities: Vec::new(),
            periods: Err(SourceError::transient("503")),
        })
    }

    #[tokio::test]
    async fn optional_source_failure_degrades_to_partial_result() {
        let router = SourceRouter::new(vec![failing_factsheet(), listing()], ThaifinConfig::default());

        assert_eq!(
            router.period_chain(),
            vec![ProviderId::Finnomena, ProviderId::SetFactsheet]
        );
        let result = router.fundamentals("ptt").await.expect("partial success");
        assert_eq!(result.coverage.contributed, vec![ProviderId::Finnomena]);
        assert_eq!(result.coverage.failed.len(), 1);
        assert_eq!(result.coverage.failed[0].provider, ProviderId::SetFactsheet);
        assert_eq!(result.data.yearly[0].get("revenue"), Some(1.0));
    }

    #[tokio::test]
    async fn required_source_failure_fails_the_call() {
        let mut config = ThaifinConfig::default();
        config.sources.required = vec![ProviderId::SetFactsheet];
        let router = SourceRouter::new(vec![listing(), failing_factsheet()], config);

        let error = router.fundamentals("PTT").await.expect_err("must fail");
        assert_eq!(error.provider(), Some(ProviderId::SetFactsheet));
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn find_is_exact_and_reports_not_found() {
        let router = SourceRouter::new(vec![listing()], ThaifinConfig::default());

        assert_eq!(router.find("ptt").await.expect("listed").symbol, ptt());
        let error = router.find("KBANK").await.expect_err("unlisted");
        assert_eq!(error.code(), "source.not_found");
        let error = router.find("").await.expect_err("invalid");
        assert_eq!(error.code(), "source.invalid_request");
    }

    #[tokio::test]
    async fn no_listing_source_means_listing_unavailable() {
        let router = SourceRouter::new(vec![failing_factsheet()], ThaifinConfig::default());
        let error = router.search("ptt", 5).await.expect_err("must fail");
        assert_eq!(error.code(), "source.listing_unavailable");
    }
}
