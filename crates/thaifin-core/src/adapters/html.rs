use scraper::{ElementRef, Html, Selector};

use crate::data_source::SourceError;

/// Plain-text projection of one HTML `<table>`.
///
/// `headers` is the first row (`th` or `td` cells); `rows` are the remaining
/// rows with at least one cell. Cell text is whitespace-collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Index of the header equal to `name`, ignoring ASCII case and spacing.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = squash(name);
        self.headers
            .iter()
            .position(|header| squash(header) == wanted)
    }

    /// First-column labels.
    pub fn row_labels(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(|row| row.first().map(String::as_str))
    }
}

fn squash(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|error| SourceError::internal(format!("invalid selector '{css}': {error}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts every table in `document`, in document order.
///
/// `scraper::Html` is not `Send`, so parsing stays inside this synchronous call
/// and only owned strings leave it.
pub fn extract_tables(document: &str) -> Result<Vec<HtmlTable>, SourceError> {
    let html = Html::parse_document(document);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("th, td")?;

    let mut tables = Vec::new();
    for table in html.select(&table_selector) {
        let mut rows = table
            .select(&row_selector)
            .map(|row| row.select(&cell_selector).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty());

        let Some(headers) = rows.next() else {
            continue;
        };
        tables.push(HtmlTable {
            headers,
            rows: rows.collect(),
        });
    }
    Ok(tables)
}

/// First table accepted by `matches`.
pub fn find_table<F>(document: &str, matches: F) -> Result<Option<HtmlTable>, SourceError>
where
    F: Fn(&HtmlTable) -> bool,
{
    Ok(extract_tables(document)?.into_iter().find(|table| matches(table)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table id="nav"><tr><td>Home</td></tr></table>
          <table class="highlights">
            <thead><tr><th>Period</th><th>2020</th><th>Q1/2021</th></tr></thead>
            <tbody>
              <tr><td>Beta</td><td> 0.95 </td><td>1.02</td></tr>
              <tr><td>ROE
                 (%)</td><td>6.10</td><td>-</td></tr>
              <tr></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    #[test]
    fn extracts_tables_with_collapsed_text() {
        let tables = extract_tables(PAGE).expect("parses");
        assert_eq!(tables.len(), 2);

        let highlights = &tables[1];
        assert_eq!(highlights.headers, vec!["Period", "2020", "Q1/2021"]);
        assert_eq!(highlights.rows.len(), 2);
        assert_eq!(highlights.rows[0], vec!["Beta", "0.95", "1.02"]);
        assert_eq!(highlights.rows[1][0], "ROE (%)");
    }

    #[test]
    fn finds_table_by_predicate() {
        let table = find_table(PAGE, |table| table.row_labels().any(|label| label == "Beta"))
            .expect("parses")
            .expect("table present");
        assert_eq!(table.column("q1/2021"), Some(2));
    }

    #[test]
    fn page_without_tables_yields_nothing() {
        let table = find_table("<p>not found</p>", |_| true).expect("parses");
        assert!(table.is_none());
    }
}
