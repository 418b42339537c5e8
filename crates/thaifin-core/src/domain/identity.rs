use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Board a security is listed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Set,
    Mai,
    Other(String),
}

impl Market {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "SET" => Self::Set,
            "MAI" => Self::Mai,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Set => "SET",
            Self::Mai => "mai",
            Self::Other(value) => value,
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved identity of one listed security. Immutable once built from a listing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityIdentity {
    pub symbol: Symbol,
    pub thai_name: String,
    pub english_name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market: Option<Market>,
}

impl SecurityIdentity {
    pub fn new(
        symbol: Symbol,
        thai_name: impl Into<String>,
        english_name: impl Into<String>,
    ) -> Self {
        Self {
            symbol,
            thai_name: thai_name.into(),
            english_name: english_name.into(),
            sector: None,
            industry: None,
            market: None,
        }
    }

    pub fn with_classification(
        mut self,
        sector: Option<String>,
        industry: Option<String>,
        market: Option<Market>,
    ) -> Self {
        self.sector = sector.filter(|value| !value.trim().is_empty());
        self.industry = industry.filter(|value| !value.trim().is_empty());
        self.market = market;
        self
    }
}
