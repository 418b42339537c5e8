//! Shared fixtures for the integration suites: a scripted HTTP client that
//! counts calls per URL, and upstream payloads for two listed securities.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use thaifin_core::{
    HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, SourceRouter,
    SourceRouterBuilder, ThaifinConfig,
};

pub const FINNOMENA: &str = "http://finnomena.test";
pub const SECURITIES: &str = "http://securities.test";
pub const SET: &str = "http://set.test";

pub const PTT_ID: &str = "0b8a9f4e-6b39-4c3c-9a5f-0d8b6f1e2a11";
pub const JAS_ID: &str = "6f1d2c3b-1a2b-4c5d-8e9f-0a1b2c3d4e5f";

pub fn listing_url() -> String {
    format!("{FINNOMENA}/stock/list?exchange=TH")
}

pub fn summary_url(security_id: &str) -> String {
    format!("{FINNOMENA}/stock/summary/{security_id}")
}

pub fn securities_url() -> String {
    format!("{SECURITIES}/securities.json")
}

pub fn factsheet_url(symbol: &str) -> String {
    format!("{SET}/en/market/product/stock/quote/{symbol}/factsheet")
}

pub fn dividends_url(symbol: &str) -> String {
    format!("{SET}/en/market/product/stock/quote/{symbol}/rights-benefits")
}

pub const LISTING: &str = r#"{
  "status": true,
  "statusCode": 200,
  "data": [
    {"name": "PTT", "th_name": "ปตท.", "en_name": "PTT Public Company Limited",
     "security_id": "0b8a9f4e-6b39-4c3c-9a5f-0d8b6f1e2a11", "exchange": "SET"},
    {"name": "JAS", "th_name": "จัสมิน อินเตอร์เนชั่นแนล", "en_name": "Jasmine International",
     "security_id": "6f1d2c3b-1a2b-4c5d-8e9f-0a1b2c3d4e5f", "exchange": "SET"}
  ]
}"#;

pub const EMPTY_LISTING: &str = r#"{"status": false, "statusCode": 500, "data": []}"#;

pub const SECURITIES_JSON: &str = r#"{
  "PTT": {"symbol": "PTT", "name": "PTT PUBLIC COMPANY LIMITED",
          "market": "SET", "industry": "Resources", "sector": "Energy & Utilities"},
  "JAS": {"symbol": "JAS", "name": "JASMINE INTERNATIONAL",
          "market": "SET", "industry": "Technology", "sector": "Information & Communication Technology"}
}"#;

/// Finnomena has revenue but no ROE for 2020Q1.
pub const PTT_SUMMARY: &str = r#"{
  "status": true,
  "statusCode": 200,
  "data": [
    {"security_id": "0b8a9f4e-6b39-4c3c-9a5f-0d8b6f1e2a11", "fiscal": 2020, "quarter": 1,
     "revenue": 228000, "roe": null, "net_profit": -1550.5},
    {"security_id": "0b8a9f4e-6b39-4c3c-9a5f-0d8b6f1e2a11", "fiscal": 2020, "quarter": 9,
     "revenue": 1615665, "roe": null}
  ]
}"#;

/// The factsheet has ROE for 2020Q1 and a revenue figure Finnomena must win over.
pub const PTT_FACTSHEET: &str = r#"
<html><body>
  <table>
    <tr><th>Highlights</th><th>Q1/2020</th><th>2020</th></tr>
    <tr><td>Beta</td><td>1.05</td><td>1.05</td></tr>
    <tr><td>ROE (%)</td><td>12.40</td><td>3.51</td></tr>
    <tr><td>Revenue (THB '000)</td><td>1,000</td><td>2,000</td></tr>
  </table>
</body></html>
"#;

pub const PTT_DIVIDENDS: &str = r#"
<html><body>
  <table>
    <tr><th>XD Date</th><th>Payment Date</th><th>Type</th>
        <th>Dividend (Baht/Share)</th><th>Operation Period</th></tr>
    <tr><td>10/02/2564</td><td>26/04/2021</td><td>Cash</td><td>1.00</td>
        <td>01/07/2020 - 31/12/2020</td></tr>
    <tr><td>20/08/2020</td><td>04/09/2020</td><td>Cash</td><td>0.80</td>
        <td>01/01/2020 - 30/06/2020</td></tr>
  </table>
</body></html>
"#;

type Scripted = Result<HttpResponse, HttpError>;

/// HTTP client answering from a per-URL script.
///
/// Each URL holds a queue of outcomes; the last one repeats once the queue is
/// drained. Unscripted URLs answer `404`.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: impl Into<String>, outcomes: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(url.into(), outcomes.into());
        self
    }

    pub fn ok(self, url: impl Into<String>, body: &str) -> Self {
        self.route(url, vec![Ok(HttpResponse::ok(body))])
    }

    pub fn status(self, url: impl Into<String>, status: u16) -> Self {
        self.route(url, vec![Ok(HttpResponse::new(status, ""))])
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").values().sum()
    }

    fn answer(&self, url: &str) -> Scripted {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(url.to_owned())
            .or_insert(0) += 1;

        let mut routes = self.routes.lock().expect("routes lock");
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty"),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let outcome = self.answer(&request.full_url());
        Box::pin(async move { outcome })
    }
}

/// Every upstream answering for PTT and JAS.
pub fn healthy_upstreams() -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .ok(listing_url(), LISTING)
        .ok(securities_url(), SECURITIES_JSON)
        .ok(summary_url(PTT_ID), PTT_SUMMARY)
        .ok(factsheet_url("PTT"), PTT_FACTSHEET)
        .ok(dividends_url("PTT"), PTT_DIVIDENDS)
}

pub fn test_config() -> ThaifinConfig {
    let mut config = ThaifinConfig::default();
    config.sources.finnomena_url = FINNOMENA.to_owned();
    config.sources.thai_securities_url = SECURITIES.to_owned();
    config.sources.set_url = SET.to_owned();
    config
}

pub fn router(client: Arc<ScriptedHttpClient>) -> SourceRouter {
    router_with(client, test_config())
}

pub fn router_with(client: Arc<ScriptedHttpClient>, config: ThaifinConfig) -> SourceRouter {
    SourceRouterBuilder::new()
        .with_config(config)
        .with_http_client(client)
        .build()
}
