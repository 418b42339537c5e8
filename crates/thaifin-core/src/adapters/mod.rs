//! Provider adapters.
//!
//! | Adapter | Provider | Endpoints |
//! |---------|----------|-----------|
//! | [`FinnomenaAdapter`] | Finnomena public market-info API | listing, periods |
//! | [`ThaiSecuritiesAdapter`] | thai-securities-data snapshot | classification |
//! | [`FactsheetAdapter`] | SET factsheet highlights page | periods |
//! | [`DividendAdapter`] | SET rights & benefits page | periods, dividends |
//!
//! Adapters share one [`SourceContext`]: the fetcher with its retry policy and
//! the payload cache. Cached values are [`SourcePayload`]s, the decoded but
//! not yet validated shape of each upstream response.

mod dividend;
mod factsheet;
mod finnomena;
mod html;
mod thai_securities;

use std::sync::Arc;

pub use dividend::DividendAdapter;
pub use factsheet::FactsheetAdapter;
pub use finnomena::{FinnomenaAdapter, ListedSecurity, StockList};
pub use html::HtmlTable;
pub use thai_securities::ThaiSecuritiesAdapter;

use crate::cache::{CacheStore, TtlClass, TtlPolicy};
use crate::config::ThaifinConfig;
use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::Fetcher;
use crate::{ProviderId, ValidationError};

/// Decoded upstream payload, one variant per response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    /// Finnomena stock list, validated at fetch time.
    FinnomenaListing(Arc<StockList>),
    /// `data` array of one Finnomena stock summary.
    FinnomenaSummary(Arc<Vec<serde_json::Value>>),
    /// `symbol -> entry` map of the securities snapshot.
    SecuritiesListing(Arc<serde_json::Map<String, serde_json::Value>>),
    FactsheetTable(Arc<HtmlTable>),
    DividendTable(Arc<HtmlTable>),
}

impl SourcePayload {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FinnomenaListing(_) => "finnomena_listing",
            Self::FinnomenaSummary(_) => "finnomena_summary",
            Self::SecuritiesListing(_) => "securities_listing",
            Self::FactsheetTable(_) => "factsheet_table",
            Self::DividendTable(_) => "dividend_table",
        }
    }

    fn unexpected(&self, expected: &str) -> SourceError {
        SourceError::internal(format!(
            "cached payload has shape '{}', expected '{expected}'",
            self.kind()
        ))
    }
}

/// Shared fetch plumbing handed to every adapter.
#[derive(Clone)]
pub struct SourceContext {
    fetcher: Fetcher,
    cache: CacheStore<SourcePayload>,
    ttl: TtlPolicy,
    timeout_ms: u64,
}

impl SourceContext {
    pub fn new(
        fetcher: Fetcher,
        cache: CacheStore<SourcePayload>,
        ttl: TtlPolicy,
        timeout_ms: u64,
    ) -> Self {
        Self {
            fetcher,
            cache,
            ttl,
            timeout_ms,
        }
    }

    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &ThaifinConfig) -> Self {
        Self::new(
            Fetcher::new(http_client, config.retry.policy()),
            CacheStore::with_mode(config.cache.max_entries, config.cache.mode),
            config.cache.ttl_policy(),
            config.sources.request_timeout_ms,
        )
    }

    /// `GET url` with the configured timeout.
    pub fn request(&self, url: impl Into<String>) -> HttpRequest {
        HttpRequest::get(url).with_timeout_ms(self.timeout_ms)
    }

    /// Cached, retried fetch. `key` must identify the call: provider, endpoint and parameters.
    pub async fn load<D>(
        &self,
        provider: ProviderId,
        key: &str,
        class: TtlClass,
        request: HttpRequest,
        decode: D,
    ) -> Result<SourcePayload, SourceError>
    where
        D: Fn(&HttpResponse) -> Result<SourcePayload, SourceError> + Send + Sync,
    {
        self.cache
            .get_or_fetch(key, self.ttl.ttl(class), || {
                self.fetcher.fetch_with(provider, request, decode)
            })
            .await
    }
}

/// Placeholders upstreams print instead of a number.
const EMPTY_MARKERS: [&str; 6] = ["", "-", "--", "—", "N/A", "n/a"];

/// Coerces a printed number (`"1,234.5"`, `"(12.0)"`, `"4.5%"`, `"-"`) to `f64`.
///
/// Placeholders yield `Ok(None)`; anything else that is not a finite number is an error.
pub fn coerce_number(field: &str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = raw.trim();
    if EMPTY_MARKERS.contains(&trimmed) {
        return Ok(None);
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .trim_end_matches('%')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();

    let value = cleaned
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber {
            field: field.to_owned(),
            value: raw.to_owned(),
        })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue {
            field: field.to_owned(),
        });
    }
    Ok(Some(if negative { -value } else { value }))
}

/// Coerces a JSON scalar (null, number or numeric string) to `f64`.
pub fn coerce_json_number(
    field: &str,
    value: &serde_json::Value,
) -> Result<Option<f64>, ValidationError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(number) => match number.as_f64() {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(ValidationError::NonFiniteValue {
                field: field.to_owned(),
            }),
        },
        serde_json::Value::String(raw) => coerce_number(field, raw),
        other => Err(ValidationError::NotANumber {
            field: field.to_owned(),
            value: other.to_string(),
        }),
    }
}

/// JSON body decode failure, retried as a malformed response.
fn malformed(provider: ProviderId, error: impl std::fmt::Display) -> SourceError {
    SourceError::transient(format!("malformed {provider} payload: {error}"))
}
