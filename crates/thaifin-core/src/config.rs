//! Runtime configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Durations are written as integer seconds (`*_secs`).
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! min_delay_secs = 4
//! max_delay_secs = 10
//!
//! [cache]
//! max_entries = 4096
//! fundamentals_ttl_secs = 86400
//! mode = "use"
//!
//! [sources]
//! priority = ["finnomena", "set_factsheet", "set_dividend"]
//! required = ["finnomena"]
//!
//! [search]
//! min_similarity = 0.6
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `THAIFIN_FINNOMENA_URL` | `sources.finnomena_url` |
//! | `THAIFIN_THAI_SECURITIES_URL` | `sources.thai_securities_url` |
//! | `THAIFIN_SET_URL` | `sources.set_url` |
//! | `THAIFIN_SOURCE_PRIORITY` | `sources.priority` (comma separated) |
//! | `THAIFIN_REQUIRED_SOURCES` | `sources.required` (comma separated) |
//! | `THAIFIN_REQUEST_TIMEOUT_MS` | `sources.request_timeout_ms` |
//! | `THAIFIN_RETRY_MAX_ATTEMPTS` | `retry.max_attempts` |
//! | `THAIFIN_CACHE_MAX_ENTRIES` | `cache.max_entries` |
//! | `THAIFIN_CACHE_MODE` | `cache.mode` |
//! | `THAIFIN_SEARCH_MIN_SIMILARITY` | `search.min_similarity` |

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheMode, TtlPolicy};
use crate::retry::{Backoff, RetryPolicy};
use crate::{CoreError, ProviderId};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThaifinConfig {
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    pub sources: SourceSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub multiplier_secs: u64,
    pub factor: f64,
    pub jitter: bool,
    pub permanent_status: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 4,
            max_delay_secs: 10,
            multiplier_secs: 1,
            factor: 2.0,
            jitter: false,
            permanent_status: vec![404, 410],
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Backoff::Exponential {
                multiplier: Duration::from_secs(self.multiplier_secs),
                factor: self.factor,
                min: Duration::from_secs(self.min_delay_secs),
                max: Duration::from_secs(self.max_delay_secs),
                jitter: self.jitter,
            },
            permanent_status: self.permanent_status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub fundamentals_ttl_secs: u64,
    pub market_ttl_secs: u64,
    pub listing_ttl_secs: u64,
    pub mode: CacheMode,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let ttl = TtlPolicy::default();
        Self {
            max_entries: 4096,
            fundamentals_ttl_secs: ttl.fundamentals.as_secs(),
            market_ttl_secs: ttl.market.as_secs(),
            listing_ttl_secs: ttl.listing.as_secs(),
            mode: CacheMode::Use,
        }
    }
}

impl CacheSettings {
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            fundamentals: Duration::from_secs(self.fundamentals_ttl_secs),
            market: Duration::from_secs(self.market_ttl_secs),
            listing: Duration::from_secs(self.listing_ttl_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub finnomena_url: String,
    pub thai_securities_url: String,
    pub set_url: String,
    /// Merge priority, highest first.
    pub priority: Vec<ProviderId>,
    /// Sources whose failure fails a fundamentals call instead of degrading it.
    pub required: Vec<ProviderId>,
    pub request_timeout_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            finnomena_url: String::from("https://www.finnomena.com/market-info/api/public"),
            thai_securities_url: String::from(
                "https://raw.githubusercontent.com/lumduan/thai-securities-data/main",
            ),
            set_url: String::from("https://www.set.or.th"),
            priority: vec![
                ProviderId::Finnomena,
                ProviderId::SetFactsheet,
                ProviderId::SetDividend,
            ],
            required: vec![ProviderId::Finnomena],
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Candidates scoring below this similarity (0..=1) are discarded.
    pub min_similarity: f64,
    /// Weight applied to best-substring similarity relative to whole-string similarity.
    pub partial_weight: f64,
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            partial_weight: 0.9,
            default_limit: 5,
        }
    }
}

impl ThaifinConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Applies `THAIFIN_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, CoreError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies `THAIFIN_*` overrides read through `lookup`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = var("THAIFIN_FINNOMENA_URL") {
            self.sources.finnomena_url = url;
        }
        if let Some(url) = var("THAIFIN_THAI_SECURITIES_URL") {
            self.sources.thai_securities_url = url;
        }
        if let Some(url) = var("THAIFIN_SET_URL") {
            self.sources.set_url = url;
        }
        if let Some(list) = var("THAIFIN_SOURCE_PRIORITY") {
            self.sources.priority = parse_provider_list(&list)?;
        }
        if let Some(list) = var("THAIFIN_REQUIRED_SOURCES") {
            self.sources.required = parse_provider_list(&list)?;
        }
        if let Some(value) = var("THAIFIN_REQUEST_TIMEOUT_MS") {
            self.sources.request_timeout_ms = parse_number("THAIFIN_REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = var("THAIFIN_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_number("THAIFIN_RETRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = var("THAIFIN_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_number("THAIFIN_CACHE_MAX_ENTRIES", &value)?;
        }
        if let Some(value) = var("THAIFIN_CACHE_MODE") {
            self.cache.mode = match value.to_ascii_lowercase().as_str() {
                "use" => CacheMode::Use,
                "refresh" => CacheMode::Refresh,
                "bypass" => CacheMode::Bypass,
                other => {
                    return Err(CoreError::Config(format!(
                        "THAIFIN_CACHE_MODE must be use, refresh or bypass, got '{other}'"
                    )))
                }
            };
        }
        if let Some(value) = var("THAIFIN_SEARCH_MIN_SIMILARITY") {
            self.search.min_similarity = parse_number("THAIFIN_SEARCH_MIN_SIMILARITY", &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.retry.min_delay_secs > self.retry.max_delay_secs {
            return Err(CoreError::Config(format!(
                "retry.min_delay_secs ({}) exceeds retry.max_delay_secs ({})",
                self.retry.min_delay_secs, self.retry.max_delay_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.search.min_similarity) {
            return Err(CoreError::Config(format!(
                "search.min_similarity must be within 0..=1, got {}",
                self.search.min_similarity
            )));
        }
        if !(0.0..=1.0).contains(&self.search.partial_weight) {
            return Err(CoreError::Config(format!(
                "search.partial_weight must be within 0..=1, got {}",
                self.search.partial_weight
            )));
        }
        for (index, provider) in self.sources.priority.iter().enumerate() {
            if self.sources.priority[..index].contains(provider) {
                return Err(CoreError::Config(format!(
                    "sources.priority lists '{provider}' more than once"
                )));
            }
        }
        Ok(())
    }
}

fn parse_provider_list(input: &str) -> Result<Vec<ProviderId>, CoreError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| ProviderId::from_str(item).map_err(CoreError::from))
        .collect()
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value
        .parse::<T>()
        .map_err(|_| CoreError::Config(format!("{name} is not a valid number: '{value}'")))
}
