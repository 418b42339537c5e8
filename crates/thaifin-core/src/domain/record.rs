use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FiscalPeriod, ProviderId, SourceRank, Symbol};

/// Sparse metric mapping. A `None` value means the source listed the field without a value;
/// a missing key means the field was never reported. Neither is ever coerced to zero.
pub type MetricMap = BTreeMap<String, Option<f64>>;

/// Grouping key of a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub symbol: Symbol,
    pub period: FiscalPeriod,
}

/// One source's view of one security's one period, keyed by source field names.
///
/// Produced by an adapter, consumed by normalization, never merged with other sources.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSourceRecord {
    pub provider: ProviderId,
    pub rank: SourceRank,
    pub symbol: Symbol,
    pub period: FiscalPeriod,
    pub fields: MetricMap,
}

impl RawSourceRecord {
    pub fn new(provider: ProviderId, rank: SourceRank, symbol: Symbol, period: FiscalPeriod) -> Self {
        Self {
            provider,
            rank,
            symbol,
            period,
            fields: MetricMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Canonical, unit-reconciled record for one security and one fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriodRecord {
    pub symbol: Symbol,
    pub period: FiscalPeriod,
    metrics: MetricMap,
    provenance: BTreeMap<String, ProviderId>,
}

impl FinancialPeriodRecord {
    pub fn new(symbol: Symbol, period: FiscalPeriod) -> Self {
        Self {
            symbol,
            period,
            metrics: MetricMap::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Value of a metric, `None` when absent or reported empty.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied().flatten()
    }

    pub fn is_populated(&self, metric: &str) -> bool {
        self.get(metric).is_some()
    }

    pub fn metrics(&self) -> &MetricMap {
        &self.metrics
    }

    /// Provider that supplied a populated metric.
    pub fn source_of(&self, metric: &str) -> Option<ProviderId> {
        self.provenance.get(metric).copied()
    }

    /// Fills `metric` unless it is already populated. Returns whether the value was taken.
    pub(crate) fn fill(&mut self, metric: &str, value: Option<f64>, provider: ProviderId) -> bool {
        if self.is_populated(metric) {
            return false;
        }
        match value {
            Some(value) => {
                self.metrics.insert(metric.to_owned(), Some(value));
                self.provenance.insert(metric.to_owned(), provider);
                true
            }
            None => {
                self.metrics.entry(metric.to_owned()).or_insert(None);
                false
            }
        }
    }
}
