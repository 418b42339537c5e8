use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::html::{find_table, HtmlTable};
use crate::adapters::{coerce_number, SourceContext, SourcePayload};
use crate::cache::TtlClass;
use crate::data_source::{
    CapabilitySet, DataSource, DividendBatch, PeriodBatch, RecordWarning, SourceError,
    SourceFuture,
};
use crate::http_client::HttpResponse;
use crate::{
    parse_calendar_date, parse_date_range, DividendKind, DividendRecord, FiscalPeriod, ProviderId,
    RawSourceRecord, SourceRank, Symbol,
};

const PROVIDER: ProviderId = ProviderId::SetDividend;

const XD_DATE: &str = "XD Date";
const PAYMENT_DATE: &str = "Payment Date";
const TYPE: &str = "Type";
const AMOUNT: &str = "Dividend (Baht/Share)";
const OPERATION_PERIOD: &str = "Operation Period";

/// SET rights & benefits page: the dividend history table.
#[derive(Clone)]
pub struct DividendAdapter {
    context: SourceContext,
    base_url: String,
    rank: SourceRank,
}

impl DividendAdapter {
    pub fn new(context: SourceContext, base_url: impl Into<String>, rank: SourceRank) -> Self {
        Self {
            context,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            rank,
        }
    }

    async fn table(&self, symbol: &Symbol) -> Result<Arc<HtmlTable>, SourceError> {
        let request = self.context.request(format!(
            "{}/en/market/product/stock/quote/{}/rights-benefits",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        ));
        let payload = self
            .context
            .load(
                PROVIDER,
                &format!("set_dividend:{symbol}"),
                TtlClass::Market,
                request,
                decode_dividends,
            )
            .await?;
        match payload {
            SourcePayload::DividendTable(table) => Ok(table),
            other => Err(other.unexpected("dividend_table")),
        }
    }
}

fn is_dividend_table(table: &HtmlTable) -> bool {
    table.column(XD_DATE).is_some() && table.column(AMOUNT).is_some()
}

/// A page without a dividend table is a security that never paid one.
fn decode_dividends(response: &HttpResponse) -> Result<SourcePayload, SourceError> {
    let table = find_table(&response.body, is_dividend_table)?.unwrap_or_default();
    Ok(SourcePayload::DividendTable(Arc::new(table)))
}

fn optional_date(
    symbol: &Symbol,
    warnings: &mut Vec<RecordWarning>,
    raw: Option<&String>,
) -> Option<time::Date> {
    let raw = raw.map(|value| value.trim()).filter(|value| !value.is_empty() && *value != "-")?;
    match parse_calendar_date(raw) {
        Ok(date) => Some(date),
        Err(error) => {
            warnings.push(RecordWarning::new(PROVIDER, Some(symbol.clone()), error.to_string()));
            None
        }
    }
}

fn parse_dividend_rows(symbol: &Symbol, table: &HtmlTable) -> DividendBatch {
    let mut batch = DividendBatch::default();
    if table.headers.is_empty() {
        return batch;
    }

    let Some(period_column) = table.column(OPERATION_PERIOD) else {
        batch.warnings.push(RecordWarning::new(
            PROVIDER,
            Some(symbol.clone()),
            format!("dividend table has no '{OPERATION_PERIOD}' column"),
        ));
        return batch;
    };
    let xd_column = table.column(XD_DATE);
    let payment_column = table.column(PAYMENT_DATE);
    let type_column = table.column(TYPE);
    let amount_column = table.column(AMOUNT);

    for row in &table.rows {
        let cell = |column: Option<usize>| column.and_then(|index| row.get(index));

        let (period_start, period_end) = match cell(Some(period_column)).map(|raw| parse_date_range(raw)) {
            Some(Ok(range)) => range,
            Some(Err(error)) => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    format!("dividend row dropped: {error}"),
                ));
                continue;
            }
            None => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    "dividend row dropped: missing operation period",
                ));
                continue;
            }
        };

        let amount_per_share = match cell(amount_column).map(|raw| coerce_number(AMOUNT, raw)) {
            Some(Ok(value)) => value,
            Some(Err(error)) => {
                batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    error.to_string(),
                ));
                None
            }
            None => None,
        };

        let record = DividendRecord {
            symbol: symbol.clone(),
            xd_date: optional_date(symbol, &mut batch.warnings, cell(xd_column)),
            payment_date: optional_date(symbol, &mut batch.warnings, cell(payment_column)),
            kind: cell(type_column)
                .map(|raw| DividendKind::parse(raw))
                .unwrap_or(DividendKind::Cash),
            amount_per_share,
            period_start,
            period_end,
        };
        batch.dividends.push(record);
    }

    batch
}

/// Sums cash dividends per fiscal year into yearly records keyed by the table's amount column.
fn yearly_totals(symbol: &Symbol, rank: SourceRank, dividends: &DividendBatch) -> PeriodBatch {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for dividend in &dividends.dividends {
        if dividend.kind != DividendKind::Cash {
            continue;
        }
        if let Some(amount) = dividend.amount_per_share {
            *totals.entry(dividend.fiscal_year()).or_insert(0.0) += amount;
        }
    }

    let mut batch = PeriodBatch {
        records: Vec::with_capacity(totals.len()),
        warnings: dividends.warnings.clone(),
    };
    for (year, total) in totals {
        match FiscalPeriod::yearly(year) {
            Ok(period) => batch.records.push(
                RawSourceRecord::new(PROVIDER, rank, symbol.clone(), period)
                    .with_field(AMOUNT, Some(total)),
            ),
            Err(error) => batch.warnings.push(RecordWarning::new(
                PROVIDER,
                Some(symbol.clone()),
                error.to_string(),
            )),
        }
    }
    batch
}

impl DataSource for DividendAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, false, true, true)
    }

    fn fetch_periods<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, PeriodBatch> {
        Box::pin(async move {
            let table = self.table(symbol).await?;
            let dividends = parse_dividend_rows(symbol, &table);
            Ok(yearly_totals(symbol, self.rank, &dividends))
        })
    }

    fn fetch_dividends<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, DividendBatch> {
        Box::pin(async move {
            let table = self.table(symbol).await?;
            Ok(parse_dividend_rows(symbol, &table))
        })
    }
}
