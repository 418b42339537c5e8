//! # Domain Models
//!
//! Canonical domain types for Thai equity fundamentals.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated SET/mai ticker |
//! | [`SecurityIdentity`] | Symbol plus bilingual names and classification |
//! | [`FiscalPeriod`] | `(fiscal_year, quarter | yearly)` reporting period |
//! | [`RawSourceRecord`] | One provider's record for one period, source field names |
//! | [`FinancialPeriodRecord`] | Merged, unit-reconciled record |
//! | [`DividendRecord`] | One dividend-history row |
//!
//! Construction validates invariants: fiscal years are Gregorian four-digit
//! years (Buddhist-era input is converted), quarters are 1..=4 or absent.

mod dates;
mod dividend;
mod identity;
mod period;
mod record;
mod symbol;

pub use dates::{parse_calendar_date, parse_date_range};
pub use dividend::{DividendKind, DividendRecord};
pub use identity::{Market, SecurityIdentity};
pub use period::{gregorian_year, FiscalPeriod, Granularity, Quarter};
pub use record::{FinancialPeriodRecord, MetricMap, RawSourceRecord, RecordKey};
pub use symbol::Symbol;
