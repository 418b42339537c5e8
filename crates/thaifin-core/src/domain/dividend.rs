use serde::{Deserialize, Serialize};
use time::Date;

use crate::Symbol;

/// Dividend payment type as printed by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendKind {
    Cash,
    Stock,
    Other(String),
}

impl DividendKind {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "cash" | "cash dividend" | "เงินปันผล" => Self::Cash,
            "stock" | "stock dividend" | "หุ้นปันผล" => Self::Stock,
            _ => Self::Other(trimmed.to_owned()),
        }
    }
}

/// One row of a security's dividend history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    pub symbol: Symbol,
    pub xd_date: Option<Date>,
    pub payment_date: Option<Date>,
    pub kind: DividendKind,
    pub amount_per_share: Option<f64>,
    pub period_start: Date,
    pub period_end: Date,
}

impl DividendRecord {
    /// Fiscal year the dividend belongs to: the year of the operation-period end.
    pub fn fiscal_year(&self) -> i32 {
        self.period_end.year()
    }
}
