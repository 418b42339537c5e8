//! Priority merge of canonical records into one record per `(symbol, period)`.

use std::collections::{BTreeMap, BTreeSet};

use crate::normalize::CanonicalRecord;
use crate::{FinancialPeriodRecord, Granularity, ProviderId, RecordKey};

/// Merged output. Quarterly and yearly records are kept in separate series,
/// each ascending by symbol, fiscal year and quarter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedSeries {
    pub quarterly: Vec<FinancialPeriodRecord>,
    pub yearly: Vec<FinancialPeriodRecord>,
    /// Providers that supplied at least one populated metric.
    pub contributors: BTreeSet<ProviderId>,
}

/// Merges records from any number of sources.
///
/// Records are applied in rank order (lowest rank first, input order among
/// equal ranks). A metric populated by an earlier record is never overwritten;
/// a later record only fills metrics still empty or missing.
pub fn merge(records: impl IntoIterator<Item = CanonicalRecord>) -> MergedSeries {
    let mut records: Vec<CanonicalRecord> = records.into_iter().collect();
    records.sort_by_key(|record| record.rank);

    let mut merged: BTreeMap<RecordKey, FinancialPeriodRecord> = BTreeMap::new();
    let mut contributors = BTreeSet::new();

    for record in records {
        let key = RecordKey {
            symbol: record.symbol.clone(),
            period: record.period,
        };
        let target = merged
            .entry(key)
            .or_insert_with(|| FinancialPeriodRecord::new(record.symbol.clone(), record.period));
        for (metric, value) in &record.metrics {
            if target.fill(metric, *value, record.provider) {
                contributors.insert(record.provider);
            }
        }
    }

    let mut series = MergedSeries {
        contributors,
        ..MergedSeries::default()
    };
    for record in merged.into_values() {
        match record.period.granularity() {
            Granularity::Quarterly => series.quarterly.push(record),
            Granularity::Yearly => series.yearly.push(record),
        }
    }
    series
}
