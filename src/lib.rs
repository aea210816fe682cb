#![deny(missing_docs)]

//! # DynamoDB Data API
//!
//! A schema-aware data access layer for Amazon DynamoDB.
//!
//! ## Overview
//!
//! Callers describe what they want with flat filters such as
//! `{ name: "launch", date <= "2000" }`; the crate looks up the table's key
//! schema once, picks the global secondary index the filter addresses and
//! compiles the filter into a native key-condition expression:
//! - Table schemas are cached per client and resolved with a single
//!   describe-table call, even under concurrent first use
//! - Throttled store calls are retried with exponential backoff and jitter
//! - Batch writes are chunked and unprocessed requests are resent
//! - Every remote call goes through the [`TableStore`](store::TableStore)
//!   trait, implemented for the SDK client
//!
//! ## Quick Example
//!
//! ```no_run
//! use dynamodb_data_api::{DataApi, Filter, QueryOptions, config::DataApiConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Event {
//!     name: String,
//!     date: String,
//!     team: String,
//! }
//!
//! # async fn example() -> dynamodb_data_api::Result<()> {
//! let api = DataApi::connect(DataApiConfig::default()).await;
//! // `team-index` is selected because `team` is its hash key
//! let events: Vec<Event> = api
//!     .query("events", Filter::new().equals("team", "xyz"), QueryOptions::default())
//!     .await?;
//! // "#name = :name and #date <= :date" on the table's own keys
//! let filter = Filter::new()
//!     .equals("name", "launch")
//!     .less_than_or_equal("date", "2000");
//! let latest: Event = api.find("events", filter, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@client`] - The [`DataApi`] caller surface
//! - [`mod@filter`] - Filters and their compilation into key conditions
//! - [`mod@schema`] - Table key schemas and their cache
//! - [`mod@store`] - The table store trait
//! - [`mod@read`], [`mod@write`], [`mod@table`] - Request types sent to the store

pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod filter;
pub mod read;
pub mod result;
pub mod retry;
pub mod schema;
pub mod store;
pub mod table;
pub mod write;

pub use client::{DataApi, QueryOptions, ScanOptions, SortOrder};
pub use error::{Error, Result};
pub use filter::{Filter, FilterValue};
