//! Data source trait and batch types.
//!
//! This module defines the adapter contract (`DataSource`) every upstream
//! provider follows, the batches adapters return and the structured
//! [`SourceError`] used by the router to decide between failing a call and
//! returning a partial result.
//!
//! # Endpoints
//!
//! | Endpoint | Method | Batch | Description |
//! |----------|--------|-------|-------------|
//! | Listing | [`DataSource::list_identities`] | [`IdentityBatch`] | Security universe |
//! | Classification | [`DataSource::list_identities`] | [`IdentityBatch`] | Sector/industry/market enrichment |
//! | Periods | [`DataSource::fetch_periods`] | [`PeriodBatch`] | Per-period metrics |
//! | Dividends | [`DataSource::fetch_dividends`] | [`DividendBatch`] | Dividend history |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{DividendRecord, ProviderId, RawSourceRecord, SecurityIdentity, Symbol};

/// Data endpoint type used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Listing,
    Classification,
    Periods,
    Dividends,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Classification => "classification",
            Self::Periods => "periods",
            Self::Dividends => "dividends",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub listing: bool,
    pub classification: bool,
    pub periods: bool,
    pub dividends: bool,
}

impl CapabilitySet {
    pub const fn new(listing: bool, classification: bool, periods: bool, dividends: bool) -> Self {
        Self {
            listing,
            classification,
            periods,
            dividends,
        }
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Listing => self.listing,
            Endpoint::Classification => self.classification,
            Endpoint::Periods => self.periods,
            Endpoint::Dividends => self.dividends,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        [
            Endpoint::Listing,
            Endpoint::Classification,
            Endpoint::Periods,
            Endpoint::Dividends,
        ]
        .into_iter()
        .filter(|endpoint| self.supports(*endpoint))
        .map(Endpoint::as_str)
        .collect()
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Network failure, timeout, 5xx or malformed payload. Retried.
    Transient,
    /// The upstream answered that the resource does not exist. Never retried.
    NotFound,
    /// The security universe cannot be enumerated.
    ListingUnavailable,
    InvalidRequest,
    UnsupportedEndpoint,
    Internal,
}

/// Structured source error used by the fetcher and the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    provider: Option<ProviderId>,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transient, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn listing_unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::ListingUnavailable, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedEndpoint,
            format!("endpoint '{endpoint}' is not supported by this source"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message)
    }

    /// Tags the error with the provider it came from, unless already tagged.
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider.get_or_insert(provider);
        self
    }

    /// Reclassifies a failed listing fetch as fatal for the calling operation.
    pub fn into_listing_unavailable(self) -> Self {
        Self {
            kind: SourceErrorKind::ListingUnavailable,
            message: format!("security listing unavailable: {}", self.message),
            provider: self.provider,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    pub const fn retryable(&self) -> bool {
        matches!(self.kind, SourceErrorKind::Transient)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transient => "source.transient",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::ListingUnavailable => "source.listing_unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "[{provider}] {} ({})", self.message, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for SourceError {}

/// A malformed record or field dropped from an otherwise usable batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWarning {
    pub provider: ProviderId,
    pub symbol: Option<Symbol>,
    pub reason: String,
}

impl RecordWarning {
    pub fn new(provider: ProviderId, symbol: Option<Symbol>, reason: impl Into<String>) -> Self {
        let warning = Self {
            provider,
            symbol,
            reason: reason.into(),
        };
        tracing::warn!(
            provider = %warning.provider,
            symbol = warning.symbol.as_ref().map(Symbol::as_str).unwrap_or("-"),
            reason = %warning.reason,
            "dropped malformed source data"
        );
        warning
    }
}

impl Display for RecordWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{} {}: {}", self.provider, symbol, self.reason),
            None => write!(f, "{}: {}", self.provider, self.reason),
        }
    }
}

/// Identities enumerated by a listing or classification source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityBatch {
    pub identities: Vec<SecurityIdentity>,
    pub warnings: Vec<RecordWarning>,
}

/// Source-named period records for one symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodBatch {
    pub records: Vec<RawSourceRecord>,
    pub warnings: Vec<RecordWarning>,
}

/// Dividend rows for one symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DividendBatch {
    pub dividends: Vec<DividendRecord>,
    pub warnings: Vec<RecordWarning>,
}

/// Boxed future returned by [`DataSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source adapter contract.
///
/// Adapters are pure translators: they fetch through the shared cache and
/// fetcher, validate required fields and emit records tagged with their
/// provider. Not every adapter exposes every endpoint; unsupported methods keep
/// the default body and fail with [`SourceErrorKind::UnsupportedEndpoint`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared behind `Arc`.
pub trait DataSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the set of supported endpoints.
    fn capabilities(&self) -> CapabilitySet;

    /// Enumerates security identities.
    ///
    /// # Errors
    ///
    /// A wholesale transport or parse failure is returned as an error; single
    /// malformed entries are dropped into [`IdentityBatch::warnings`].
    fn list_identities<'a>(&'a self) -> SourceFuture<'a, IdentityBatch> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Listing)) })
    }

    /// Fetches every period this source reports for `symbol`, keyed by source field names.
    fn fetch_periods<'a>(&'a self, _symbol: &'a Symbol) -> SourceFuture<'a, PeriodBatch> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Periods)) })
    }

    /// Fetches the dividend history of `symbol`.
    fn fetch_dividends<'a>(&'a self, _symbol: &'a Symbol) -> SourceFuture<'a, DividendBatch> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Dividends)) })
    }
}
