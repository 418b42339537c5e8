//! Field-name and unit reconciliation.
//!
//! Each provider owns a static table mapping its field names to canonical
//! metric names, with the conversion into the canonical unit:
//!
//! | Quantity | Canonical unit |
//! |----------|----------------|
//! | Monetary amounts | THB million |
//! | Ratios, margins, yields, growth | percent |
//! | Per-share values | THB |
//! | Multiples, beta | unitless |
//!
//! Unmapped source fields are dropped here, before merge.

use crate::domain::MetricMap;
use crate::{FiscalPeriod, ProviderId, RawSourceRecord, SourceRank, Symbol};

/// Conversion from a source unit into the canonical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Already canonical.
    Identity,
    /// THB thousand to THB million.
    Thousands,
    /// Fraction (`0.12`) to percent (`12.0`).
    FractionToPercent,
}

impl Unit {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Thousands => value / 1_000.0,
            Self::FractionToPercent => value * 100.0,
        }
    }
}

/// One row of a provider's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source_field: &'static str,
    pub canonical: &'static str,
    pub unit: Unit,
}

const fn same(name: &'static str) -> FieldMapping {
    FieldMapping {
        source_field: name,
        canonical: name,
        unit: Unit::Identity,
    }
}

const fn mapped(source_field: &'static str, canonical: &'static str, unit: Unit) -> FieldMapping {
    FieldMapping {
        source_field,
        canonical,
        unit,
    }
}

/// Finnomena already reports canonical names and units.
const FINNOMENA_FIELDS: &[FieldMapping] = &[
    same("cash"),
    same("da"),
    same("debt_to_equity"),
    same("equity"),
    same("earning_per_share"),
    same("earning_per_share_yoy"),
    same("earning_per_share_qoq"),
    same("gpm"),
    same("gross_profit"),
    same("net_profit"),
    same("net_profit_yoy"),
    same("net_profit_qoq"),
    same("npm"),
    same("revenue"),
    same("revenue_yoy"),
    same("revenue_qoq"),
    same("roa"),
    same("roe"),
    same("sga"),
    same("sga_per_revenue"),
    same("total_debt"),
    same("dividend_yield"),
    same("book_value_per_share"),
    same("close"),
    same("mkt_cap"),
    same("price_earning_ratio"),
    same("price_book_value"),
    same("ev_per_ebit_da"),
    same("ebit_dattm"),
    same("paid_up_capital"),
    same("cash_cycle"),
    same("operating_activities"),
    same("investing_activities"),
    same("financing_activities"),
    same("asset"),
];

const SET_FACTSHEET_FIELDS: &[FieldMapping] = &[
    mapped("Beta", "beta", Unit::Identity),
    mapped("ROE (%)", "roe", Unit::Identity),
    mapped("ROA (%)", "roa", Unit::Identity),
    mapped("Net Margin", "npm", Unit::FractionToPercent),
    mapped("Revenue (THB '000)", "revenue", Unit::Thousands),
    mapped("Dividend Yield (%)", "dividend_yield", Unit::Identity),
    mapped("P/E (X)", "price_earning_ratio", Unit::Identity),
    mapped("P/BV (X)", "price_book_value", Unit::Identity),
];

const SET_DIVIDEND_FIELDS: &[FieldMapping] = &[mapped(
    "Dividend (Baht/Share)",
    "dividend_per_share",
    Unit::Identity,
)];

/// Field table of `provider`. Providers that report no period metrics have none.
pub const fn field_table(provider: ProviderId) -> &'static [FieldMapping] {
    match provider {
        ProviderId::Finnomena => FINNOMENA_FIELDS,
        ProviderId::SetFactsheet => SET_FACTSHEET_FIELDS,
        ProviderId::SetDividend => SET_DIVIDEND_FIELDS,
        ProviderId::ThaiSecuritiesData => &[],
    }
}

/// Mapping for `source_field` in `provider`'s table. Matching ignores ASCII case.
pub fn lookup(provider: ProviderId, source_field: &str) -> Option<&'static FieldMapping> {
    field_table(provider)
        .iter()
        .find(|mapping| mapping.source_field.eq_ignore_ascii_case(source_field.trim()))
}

/// A source record expressed in canonical metric names and units.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub provider: ProviderId,
    pub rank: SourceRank,
    pub symbol: Symbol,
    pub period: FiscalPeriod,
    pub metrics: MetricMap,
}

/// Renames and converts every mapped field of `record`; unmapped fields are dropped.
pub fn normalize(record: RawSourceRecord) -> CanonicalRecord {
    let RawSourceRecord {
        provider,
        rank,
        symbol,
        period,
        fields,
    } = record;

    let mut metrics = MetricMap::new();
    for (name, value) in fields {
        match lookup(provider, &name) {
            Some(mapping) => {
                let converted = value.map(|value| mapping.unit.apply(value));
                // Two source spellings of one metric: keep the populated one.
                let slot = metrics.entry(mapping.canonical.to_owned()).or_insert(None);
                if slot.is_none() {
                    *slot = converted;
                }
            }
            None => {
                tracing::trace!(provider = %provider, field = %name, "dropping unmapped source field");
            }
        }
    }

    CanonicalRecord {
        provider,
        rank,
        symbol,
        period,
        metrics,
    }
}

/// Normalizes a batch.
pub fn normalize_all(records: impl IntoIterator<Item = RawSourceRecord>) -> Vec<CanonicalRecord> {
    records.into_iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(provider: ProviderId) -> RawSourceRecord {
        RawSourceRecord::new(
            provider,
            SourceRank(1),
            Symbol::parse("PTT").expect("valid"),
            FiscalPeriod::yearly(2020).expect("valid"),
        )
    }

    #[test]
    fn factsheet_units_are_reconciled() {
        let record = raw(ProviderId::SetFactsheet)
            .with_field("Net Margin", Some(0.0425))
            .with_field("Revenue (THB '000)", Some(1_615_665_000.0))
            .with_field("ROE (%)", Some(12.4))
            .with_field("Beta", None)
            .with_field("Free Float (%)", Some(48.0));

        let canonical = normalize(record);

        let npm = canonical.metrics["npm"].expect("npm populated");
        assert!((npm - 4.25).abs() < 1e-9);
        assert_eq!(canonical.metrics["revenue"], Some(1_615_665.0));
        assert_eq!(canonical.metrics["roe"], Some(12.4));
        assert_eq!(canonical.metrics.get("beta"), Some(&None));
        assert_eq!(canonical.metrics.len(), 4);
    }

    #[test]
    fn finnomena_fields_pass_through() {
        let canonical = normalize(
            raw(ProviderId::Finnomena)
                .with_field("revenue", Some(228_000.0))
                .with_field("roe", None),
        );
        assert_eq!(canonical.metrics["revenue"], Some(228_000.0));
        assert_eq!(canonical.metrics["roe"], None);
    }

    #[test]
    fn dividend_column_maps_to_dividend_per_share() {
        let canonical = normalize(raw(ProviderId::SetDividend).with_field("Dividend (Baht/Share)", Some(1.5)));
        assert_eq!(canonical.metrics["dividend_per_share"], Some(1.5));
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        assert_eq!(
            lookup(ProviderId::SetFactsheet, " roe (%) ").map(|mapping| mapping.canonical),
            Some("roe")
        );
        assert!(lookup(ProviderId::ThaiSecuritiesData, "sector").is_none());
    }
}
