use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{malformed, SourceContext, SourcePayload};
use crate::cache::TtlClass;
use crate::data_source::{
    CapabilitySet, DataSource, IdentityBatch, RecordWarning, SourceError, SourceFuture,
};
use crate::http_client::HttpResponse;
use crate::{Market, ProviderId, SecurityIdentity, Symbol};

const PROVIDER: ProviderId = ProviderId::ThaiSecuritiesData;

#[derive(Debug, Deserialize)]
struct SecurityEntry {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    sector: Option<String>,
}

/// Community-maintained securities snapshot: sector, industry and board per symbol.
#[derive(Clone)]
pub struct ThaiSecuritiesAdapter {
    context: SourceContext,
    base_url: String,
}

impl ThaiSecuritiesAdapter {
    pub fn new(context: SourceContext, base_url: impl Into<String>) -> Self {
        Self {
            context,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

fn decode_securities(response: &HttpResponse) -> Result<SourcePayload, SourceError> {
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&response.body).map_err(|error| malformed(PROVIDER, error))?;
    Ok(SourcePayload::SecuritiesListing(Arc::new(map)))
}

fn parse_securities(map: &serde_json::Map<String, serde_json::Value>) -> IdentityBatch {
    let mut batch = IdentityBatch::default();

    for (key, value) in map {
        let entry = match SecurityEntry::deserialize(value) {
            Ok(entry) => entry,
            Err(error) => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Symbol::parse(key).ok(),
                    format!("securities entry is malformed: {error}"),
                ));
                continue;
            }
        };

        let raw_symbol = entry.symbol.as_deref().unwrap_or(key.as_str());
        let symbol = match Symbol::parse(raw_symbol) {
            Ok(symbol) => symbol,
            Err(error) => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    None,
                    format!("securities entry '{key}': {error}"),
                ));
                continue;
            }
        };

        let identity = SecurityIdentity::new(symbol, "", entry.name.unwrap_or_default().trim())
            .with_classification(
                entry.sector,
                entry.industry,
                entry
                    .market
                    .as_deref()
                    .map(str::trim)
                    .filter(|market| !market.is_empty())
                    .map(Market::parse),
            );
        batch.identities.push(identity);
    }

    batch
}

impl DataSource for ThaiSecuritiesAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, true, false, false)
    }

    fn list_identities<'a>(&'a self) -> SourceFuture<'a, IdentityBatch> {
        Box::pin(async move {
            let request = self
                .context
                .request(format!("{}/securities.json", self.base_url));
            let payload = self
                .context
                .load(
                    PROVIDER,
                    "thai_securities_data:securities",
                    TtlClass::Listing,
                    request,
                    decode_securities,
                )
                .await?;
            match payload {
                SourcePayload::SecuritiesListing(map) => Ok(parse_securities(&map)),
                other => Err(other.unexpected("securities_listing")),
            }
        })
    }
}
