use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in records, cache keys and coverage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Finnomena,
    ThaiSecuritiesData,
    SetFactsheet,
    SetDividend,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finnomena => "finnomena",
            Self::ThaiSecuritiesData => "thai_securities_data",
            Self::SetFactsheet => "set_factsheet",
            Self::SetDividend => "set_dividend",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "finnomena" => Ok(Self::Finnomena),
            "thai_securities_data" | "thai-securities-data" => Ok(Self::ThaiSecuritiesData),
            "set_factsheet" | "set-factsheet" => Ok(Self::SetFactsheet),
            "set_dividend" | "set-dividend" => Ok(Self::SetDividend),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

/// Position of a provider in the merge priority order. Lower ranks win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRank(pub u8);

impl SourceRank {
    pub const PRIMARY: Self = Self(0);

    /// Rank of `provider` within `order`; providers missing from the order sort last.
    pub fn from_order(order: &[ProviderId], provider: ProviderId) -> Self {
        let position = order
            .iter()
            .position(|candidate| *candidate == provider)
            .unwrap_or(order.len());
        Self(u8::try_from(position).unwrap_or(u8::MAX))
    }
}
