//! # Thaifin Core
//!
//! Multi-source acquisition and normalization of Thai listed-equity fundamentals.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Canonical domain models** for symbols, identities, fiscal periods and records
//! - **Resilient fetching** with bounded retry and exponential backoff
//! - **TTL + LRU caching** with single-flight population
//! - **Provider adapters** for Finnomena, thai-securities-data and two SET pages
//! - **Normalization and merge** of per-source records by priority
//! - **Bilingual search** over the listed universe
//! - **Tabular projection** of merged series
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters and shared fetch context |
//! | [`cache`] | TTL + LRU cache store |
//! | [`config`] | TOML and environment configuration |
//! | [`data_source`] | Data source trait, batches and errors |
//! | [`domain`] | Domain models |
//! | [`error`] | Core error types |
//! | [`frame`] | Period-indexed tables |
//! | [`http_client`] | HTTP client abstraction |
//! | [`merge`] | Priority merge |
//! | [`normalize`] | Field-name and unit reconciliation |
//! | [`retry`] | Retry policy and fetcher |
//! | [`routing`] | Source registry and caller-facing operations |
//! | [`search`] | Bilingual search index |
//! | [`source`] | Provider identifiers and ranks |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use thaifin_core::SourceRouterBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = SourceRouterBuilder::from_env()?.build();
//!
//!     let hits = router.search("จัสมิน", 5).await?;
//!     let symbol = hits[0].identity.symbol.clone();
//!
//!     let fundamentals = router.fundamentals(symbol.as_str()).await?;
//!     let frame = fundamentals.data.quarter_frame();
//!     println!("{:?}", frame.value("2020Q1", "revenue"));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Source Router  │────▶│  Search Index    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ Cache Store      │
//! │ (Adapter Trait) │     └────────┬─────────┘
//! └────────┬────────┘              ▼
//!          │              ┌──────────────────┐
//!          │              │ Fetcher + Retry  │──▶ HTTP Client
//!          ▼              └──────────────────┘
//! ┌─────────────────┐
//! │ Normalize/Merge │──▶ Frame
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Caller-facing operations fail with a [`SourceError`] of one of three kinds;
//! everything else resolves to a possibly partial result with coverage:
//!
//! ```rust
//! use thaifin_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::NotFound => {
//!             // Unknown symbol or page
//!         }
//!         SourceErrorKind::Transient => {
//!             // Retries exhausted, safe to call again later
//!         }
//!         SourceErrorKind::ListingUnavailable => {
//!             // Security universe could not be enumerated
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod frame;
pub mod http_client;
pub mod merge;
pub mod normalize;
pub mod retry;
pub mod routing;
pub mod search;
pub mod source;

// Adapter implementations
pub use adapters::{
    DividendAdapter, FactsheetAdapter, FinnomenaAdapter, HtmlTable, ListedSecurity, SourceContext,
    SourcePayload, StockList, ThaiSecuritiesAdapter,
};

// Caching
pub use cache::{CacheMode, CacheStore, TtlClass, TtlPolicy};

// Configuration
pub use config::{CacheSettings, RetrySettings, SearchSettings, SourceSettings, ThaifinConfig};

// Data source trait and types
pub use data_source::{
    CapabilitySet, DataSource, DividendBatch, Endpoint, IdentityBatch, PeriodBatch, RecordWarning,
    SourceError, SourceErrorKind, SourceFuture,
};

// Domain models
pub use domain::{
    gregorian_year, parse_calendar_date, parse_date_range, DividendKind, DividendRecord,
    FinancialPeriodRecord, FiscalPeriod, Granularity, Market, MetricMap, Quarter, RawSourceRecord,
    RecordKey, SecurityIdentity, Symbol,
};

// Error types
pub use error::{CoreError, ValidationError};

// Tabular projection
pub use frame::Frame;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Normalization and merge
pub use merge::{merge, MergedSeries};
pub use normalize::{normalize, normalize_all, CanonicalRecord};

// Retry logic
pub use retry::{Backoff, Fetcher, RetryPolicy};

// Routing types
pub use routing::{
    Coverage, Fundamentals, RouteSuccess, SourceFailure, SourceRouter, SourceRouterBuilder,
};

// Search
pub use search::{SearchHit, SearchIndex};

// Source identifiers
pub use source::{ProviderId, SourceRank};
