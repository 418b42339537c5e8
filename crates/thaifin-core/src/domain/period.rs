use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MIN_FISCAL_YEAR: i32 = 1900;
const MAX_FISCAL_YEAR: i32 = 2199;

/// Years at or above this value are Buddhist era (B.E. = C.E. + 543).
const BUDDHIST_ERA_THRESHOLD: i32 = 2400;
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Converts a Buddhist-era year to Gregorian; Gregorian input is returned unchanged.
pub fn gregorian_year(year: i32) -> i32 {
    if year >= BUDDHIST_ERA_THRESHOLD {
        year - BUDDHIST_ERA_OFFSET
    } else {
        year
    }
}

/// Reporting granularity. Quarterly and yearly series are never interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Quarterly,
    Yearly,
}

/// Fiscal quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn from_number(value: i64) -> Result<Self, ValidationError> {
        match value {
            1 => Ok(Self::Q1),
            2 => Ok(Self::Q2),
            3 => Ok(Self::Q3),
            4 => Ok(Self::Q4),
            other => Err(ValidationError::InvalidQuarter { value: other }),
        }
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }
}

impl TryFrom<u8> for Quarter {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(i64::from(value))
    }
}

impl From<Quarter> for u8 {
    fn from(value: Quarter) -> Self {
        value.number()
    }
}

/// A `(fiscal_year, quarter | yearly)` pair identifying one reporting period.
///
/// Ordering is by year, then quarter, with the yearly period of a year sorting
/// after all of that year's quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodFields", into = "PeriodFields")]
pub struct FiscalPeriod {
    fiscal_year: u16,
    quarter: Option<Quarter>,
}

/// Serialized form of [`FiscalPeriod`], validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PeriodFields {
    fiscal_year: i32,
    quarter: Option<Quarter>,
}

impl TryFrom<PeriodFields> for FiscalPeriod {
    type Error = ValidationError;

    fn try_from(fields: PeriodFields) -> Result<Self, Self::Error> {
        Self::new(fields.fiscal_year, fields.quarter)
    }
}

impl From<FiscalPeriod> for PeriodFields {
    fn from(period: FiscalPeriod) -> Self {
        Self {
            fiscal_year: i32::from(period.fiscal_year),
            quarter: period.quarter,
        }
    }
}

impl FiscalPeriod {
    pub fn new(fiscal_year: i32, quarter: Option<Quarter>) -> Result<Self, ValidationError> {
        let year = gregorian_year(fiscal_year);
        if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&year) {
            return Err(ValidationError::FiscalYearOutOfRange {
                year: i64::from(fiscal_year),
            });
        }
        Ok(Self {
            fiscal_year: year as u16,
            quarter,
        })
    }

    pub fn quarterly(fiscal_year: i32, quarter: Quarter) -> Result<Self, ValidationError> {
        Self::new(fiscal_year, Some(quarter))
    }

    pub fn yearly(fiscal_year: i32) -> Result<Self, ValidationError> {
        Self::new(fiscal_year, None)
    }

    /// Parses the period labels used by Thai sources and by [`FiscalPeriod::label`]:
    /// `2020`, `2563`, `2020Q1`, `Q1/2021`, `Q1/2564`, `Q1 2021`.
    pub fn parse_label(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidPeriodLabel {
            value: input.to_owned(),
        };
        let label = input.trim().to_ascii_uppercase();

        if let Ok(year) = label.parse::<i32>() {
            return Self::yearly(year).map_err(|_| invalid());
        }

        let (quarter, year) = if let Some(rest) = label.strip_prefix('Q') {
            let mut parts = rest.splitn(2, |ch: char| ch == '/' || ch == ' ' || ch == '-');
            let quarter = parts.next().ok_or_else(invalid)?;
            let year = parts.next().ok_or_else(invalid)?;
            (quarter.trim(), year.trim())
        } else if let Some((year, quarter)) = label.split_once('Q') {
            (quarter.trim(), year.trim())
        } else {
            return Err(invalid());
        };

        let quarter = quarter.parse::<i64>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        Self::quarterly(year, Quarter::from_number(quarter).map_err(|_| invalid())?)
            .map_err(|_| invalid())
    }

    pub const fn fiscal_year(self) -> u16 {
        self.fiscal_year
    }

    pub const fn quarter(self) -> Option<Quarter> {
        self.quarter
    }

    pub const fn granularity(self) -> Granularity {
        match self.quarter {
            Some(_) => Granularity::Quarterly,
            None => Granularity::Yearly,
        }
    }

    /// Frame index label: `"{year}Q{quarter}"` or `"{year}"`.
    pub fn label(self) -> String {
        match self.quarter {
            Some(quarter) => format!("{}Q{}", self.fiscal_year, quarter.number()),
            None => self.fiscal_year.to_string(),
        }
    }
}

impl Ord for FiscalPeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fiscal_year
            .cmp(&other.fiscal_year)
            .then_with(|| match (self.quarter, other.quarter) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl PartialOrd for FiscalPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for FiscalPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
