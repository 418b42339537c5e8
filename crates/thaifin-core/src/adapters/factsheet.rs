use std::sync::Arc;

use crate::adapters::html::{find_table, HtmlTable};
use crate::adapters::{coerce_number, SourceContext, SourcePayload};
use crate::cache::TtlClass;
use crate::data_source::{
    CapabilitySet, DataSource, PeriodBatch, RecordWarning, SourceError, SourceFuture,
};
use crate::http_client::HttpResponse;
use crate::{FiscalPeriod, ProviderId, RawSourceRecord, SourceRank, Symbol};

const PROVIDER: ProviderId = ProviderId::SetFactsheet;

/// Row label identifying the highlights table.
const ANCHOR_ROW: &str = "Beta";

/// SET factsheet highlights: beta, returns, margins and multiples per period column.
#[derive(Clone)]
pub struct FactsheetAdapter {
    context: SourceContext,
    base_url: String,
    rank: SourceRank,
}

impl FactsheetAdapter {
    pub fn new(context: SourceContext, base_url: impl Into<String>, rank: SourceRank) -> Self {
        Self {
            context,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            rank,
        }
    }

    fn url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/en/market/product/stock/quote/{}/factsheet",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        )
    }
}

fn is_highlights(table: &HtmlTable) -> bool {
    table
        .row_labels()
        .any(|label| label.eq_ignore_ascii_case(ANCHOR_ROW))
}

fn decode_factsheet(response: &HttpResponse) -> Result<SourcePayload, SourceError> {
    match find_table(&response.body, is_highlights)? {
        Some(table) => Ok(SourcePayload::FactsheetTable(Arc::new(table))),
        None => Err(SourceError::not_found(
            "factsheet page has no highlights table",
        )),
    }
}

/// Turns the period-by-column highlights table into one record per period column.
fn parse_highlights(symbol: &Symbol, rank: SourceRank, table: &HtmlTable) -> PeriodBatch {
    let mut batch = PeriodBatch::default();

    let mut columns = Vec::new();
    for (index, header) in table.headers.iter().enumerate().skip(1) {
        match FiscalPeriod::parse_label(header) {
            Ok(period) => columns.push((index, RawSourceRecord::new(PROVIDER, rank, symbol.clone(), period))),
            Err(error) => batch.warnings.push(RecordWarning::new(
                PROVIDER,
                Some(symbol.clone()),
                format!("period column dropped: {error}"),
            )),
        }
    }

    for row in &table.rows {
        let Some(label) = row.first() else {
            continue;
        };
        for (index, record) in &mut columns {
            let Some(cell) = row.get(*index) else {
                continue;
            };
            match coerce_number(label, cell) {
                Ok(value) => {
                    record.fields.insert(label.clone(), value);
                }
                Err(error) => batch.warnings.push(RecordWarning::new(
                    PROVIDER,
                    Some(symbol.clone()),
                    format!("{}: {error}", record.period),
                )),
            }
        }
    }

    batch.records = columns.into_iter().map(|(_, record)| record).collect();
    batch
}

impl DataSource for FactsheetAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, false, true, false)
    }

    fn fetch_periods<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, PeriodBatch> {
        Box::pin(async move {
            let request = self.context.request(self.url(symbol));
            let payload = self
                .context
                .load(
                    PROVIDER,
                    &format!("set_factsheet:{symbol}"),
                    TtlClass::Market,
                    request,
                    decode_factsheet,
                )
                .await?;
            let table = match payload {
                SourcePayload::FactsheetTable(table) => table,
                other => return Err(other.unexpected("factsheet_table")),
            };
            Ok(parse_highlights(symbol, self.rank, &table))
        })
    }
}
