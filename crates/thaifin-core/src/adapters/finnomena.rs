use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::adapters::{coerce_json_number, coerce_number, malformed, SourceContext, SourcePayload};
use crate::cache::TtlClass;
use crate::data_source::{
    CapabilitySet, DataSource, IdentityBatch, PeriodBatch, RecordWarning, SourceError,
    SourceFuture,
};
use crate::http_client::HttpResponse;
use crate::{
    FiscalPeriod, Market, ProviderId, Quarter, RawSourceRecord, SecurityIdentity, SourceRank,
    Symbol, ValidationError,
};

const PROVIDER: ProviderId = ProviderId::Finnomena;

/// `quarter` value Finnomena uses for full-year rows.
const YEARLY_QUARTER: i64 = 9;

/// Summary keys that describe the row rather than a metric.
const ROW_KEYS: [&str; 4] = ["security_id", "fiscal", "quarter", "end_of_year_date"];

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<bool>,
    #[serde(rename = "statusCode", default)]
    status_code: Option<u16>,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(default)]
    th_name: Option<String>,
    #[serde(default)]
    en_name: Option<String>,
    security_id: String,
    #[serde(default)]
    exchange: Option<String>,
}

/// A listed security together with the Finnomena id its statements are keyed by.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedSecurity {
    pub identity: SecurityIdentity,
    pub security_id: Uuid,
}

/// Stock list parsed once per fetch; cache hits reuse it without re-validating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StockList {
    pub securities: Vec<ListedSecurity>,
    pub warnings: Vec<RecordWarning>,
}

/// Finnomena market-info API: the security universe and per-period statements.
#[derive(Clone)]
pub struct FinnomenaAdapter {
    context: SourceContext,
    base_url: String,
    rank: SourceRank,
}

impl FinnomenaAdapter {
    pub fn new(context: SourceContext, base_url: impl Into<String>, rank: SourceRank) -> Self {
        Self {
            context,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            rank,
        }
    }

    pub async fn stock_list(&self) -> Result<Arc<StockList>, SourceError> {
        let request = self
            .context
            .request(format!("{}/stock/list", self.base_url))
            .with_query("exchange", "TH");
        let payload = self
            .context
            .load(
                PROVIDER,
                "finnomena:stock_list:TH",
                TtlClass::Listing,
                request,
                decode_listing,
            )
            .await?;
        match payload {
            SourcePayload::FinnomenaListing(list) => Ok(list),
            other => Err(other.unexpected("finnomena_listing")),
        }
    }

    /// Finnomena id of `symbol`; [`SourceErrorKind::NotFound`](crate::SourceErrorKind) when unlisted.
    pub async fn security_id(&self, symbol: &Symbol) -> Result<Uuid, SourceError> {
        let list = self.stock_list().await?;
        list.securities
            .iter()
            .find(|listed| &listed.identity.symbol == symbol)
            .map(|listed| listed.security_id)
            .ok_or_else(|| {
                SourceError::not_found(format!("symbol '{symbol}' is not listed"))
                    .with_provider(PROVIDER)
            })
    }

    async fn summary_rows(&self, security_id: Uuid) -> Result<Arc<Vec<Value>>, SourceError> {
        let request = self
            .context
            .request(format!("{}/stock/summary/{security_id}", self.base_url));
        let payload = self
            .context
            .load(
                PROVIDER,
                &format!("finnomena:summary:{security_id}"),
                TtlClass::Fundamentals,
                request,
                decode_summary,
            )
            .await?;
        match payload {
            SourcePayload::FinnomenaSummary(rows) => Ok(rows),
            other => Err(other.unexpected("finnomena_summary")),
        }
    }
}

fn decode_envelope(response: &HttpResponse) -> Result<Envelope, SourceError> {
    serde_json::from_str(&response.body).map_err(|error| malformed(PROVIDER, error))
}

fn decode_listing(response: &HttpResponse) -> Result<SourcePayload, SourceError> {
    let envelope = decode_envelope(response)?;
    if let Some(code) = envelope.status_code.filter(|code| *code != 200) {
        return Err(SourceError::listing_unavailable(format!(
            "stock list answered statusCode {code} (status {:?})",
            envelope.status
        )));
    }
    match envelope.data {
        Some(entries) if !entries.is_empty() => {
            let list = parse_listing(&entries);
            tracing::info!(
                provider = %PROVIDER,
                securities = list.securities.len(),
                dropped = list.warnings.len(),
                "fetched stock list"
            );
            Ok(SourcePayload::FinnomenaListing(Arc::new(list)))
        }
        _ => Err(SourceError::listing_unavailable(
            "stock list response carried no securities",
        )),
    }
}

fn decode_summary(response: &HttpResponse) -> Result<SourcePayload, SourceError> {
    let envelope = decode_envelope(response)?;
    match envelope.status_code {
        Some(404) => Err(SourceError::not_found("stock summary does not exist")),
        Some(code) if code != 200 => Err(SourceError::transient(format!(
            "stock summary answered statusCode {code}"
        ))),
        _ => Ok(SourcePayload::FinnomenaSummary(Arc::new(
            envelope.data.unwrap_or_default(),
        ))),
    }
}

fn parse_listing(entries: &[Value]) -> StockList {
    let mut securities = Vec::with_capacity(entries.len());
    let mut warnings = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let parsed = match ListingEntry::deserialize(entry) {
            Ok(parsed) => parsed,
            Err(error) => {
                warnings.push(RecordWarning::new(
                    PROVIDER,
                    None,
                    format!("listing entry {index} is malformed: {error}"),
                ));
                continue;
            }
        };

        let symbol = match Symbol::parse(&parsed.name) {
            Ok(symbol) => symbol,
            Err(error) => {
                warnings.push(RecordWarning::new(
                    PROVIDER,
                    None,
                    format!("listing entry {index}: {error}"),
                ));
                continue;
            }
        };

        let security_id = match Uuid::parse_str(parsed.security_id.trim()) {
            Ok(id) => id,
            Err(_) => {
                let error = ValidationError::InvalidSecurityId {
                    value: parsed.security_id,
                };
                warnings.push(RecordWarning::new(PROVIDER, Some(symbol), error.to_string()));
                continue;
            }
        };

        let market = parsed
            .exchange
            .as_deref()
            .map(str::trim)
            .filter(|exchange| !exchange.is_empty() && !exchange.eq_ignore_ascii_case("TH"))
            .map(Market::parse);
        let identity = SecurityIdentity::new(
            symbol,
            parsed.th_name.unwrap_or_default().trim(),
            parsed.en_name.unwrap_or_default().trim(),
        )
        .with_classification(None, None, market);

        securities.push(ListedSecurity {
            identity,
            security_id,
        });
    }

    StockList {
        securities,
        warnings,
    }
}

/// Integer row field, as a JSON integer or an integer string. Fractions are rejected.
fn integer_field(row: &Value, field: &'static str) -> Result<i64, ValidationError> {
    let value = row.get(field).ok_or(ValidationError::MissingField { field })?;
    let not_integer = || ValidationError::NotANumber {
        field: field.to_owned(),
        value: value.to_string(),
    };
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(not_integer),
        Value::String(raw) => match coerce_number(field, raw)? {
            Some(_) => raw.trim().parse::<i64>().map_err(|_| not_integer()),
            None => Err(ValidationError::MissingField { field }),
        },
        Value::Null => Err(ValidationError::MissingField { field }),
        _ => Err(not_integer()),
    }
}

fn row_period(row: &Value) -> Result<FiscalPeriod, ValidationError> {
    let fiscal = integer_field(row, "fiscal")?;
    let fiscal = i32::try_from(fiscal)
        .map_err(|_| ValidationError::FiscalYearOutOfRange { year: fiscal })?;
    match integer_field(row, "quarter")? {
        YEARLY_QUARTER => FiscalPeriod::yearly(fiscal),
        quarter => FiscalPeriod::quarterly(fiscal, Quarter::from_number(quarter)?),
    }
}

fn parse_summary(symbol: &Symbol, rank: SourceRank, rows: &[Value]) -> PeriodBatch {
    let mut batch = PeriodBatch::default();

    for row in rows {
        let Some(fields) = row.as_object() else {
            batch.warnings.push(RecordWarning::new(
                PROVIDER,
                Some(symbol.clone()),
                "summary row is not an object",
            ));
            continue;
        };

        let period = match row_period(row) {
            Ok(period) => period,
            Err(error) => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    format!("summary row dropped: {error}"),
                ));
                continue;
            }
        };

        let mut record = RawSourceRecord::new(PROVIDER, rank, symbol.clone(), period);
        for (name, value) in fields {
            if ROW_KEYS.contains(&name.as_str()) {
                continue;
            }
            match coerce_json_number(name, value) {
                Ok(value) => {
                    record.fields.insert(name.clone(), value);
                }
                Err(error) => batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    format!("{period}: {error}"),
                )),
            }
        }
        batch.records.push(record);
    }

    batch
}

impl DataSource for FinnomenaAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, true, false)
    }

    fn list_identities<'a>(&'a self) -> SourceFuture<'a, IdentityBatch> {
        Box::pin(async move {
            let list = self.stock_list().await?;
            Ok(IdentityBatch {
                identities: list
                    .securities
                    .iter()
                    .map(|listed| listed.identity.clone())
                    .collect(),
                warnings: list.warnings.clone(),
            })
        })
    }

    fn fetch_periods<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, PeriodBatch> {
        Box::pin(async move {
            let security_id = self.security_id(symbol).await?;
            let rows = self.summary_rows(security_id).await?;
            let batch = parse_summary(symbol, self.rank, &rows);
            tracing::debug!(
                provider = %PROVIDER,
                symbol = %symbol,
                records = batch.records.len(),
                dropped = batch.warnings.len(),
                "parsed stock summary"
            );
            Ok(batch)
        })
    }
}
