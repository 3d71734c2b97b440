//! 511.org transit integration
//!
//! Fetches real-time stop visits and vehicle activities from the
//! [511 SF Bay](https://511.org/open-data/transit) SIRI API.
//!
//! # Architecture
//!
//! The crate follows the client-trait pattern of the other integration crates.
//! [`MonitoringClient`] defines a single-round-trip fetch for one
//! [`domain::ResourceKey`], implemented by [`Transit511Client`]. Responses are
//! normalised into [`domain::ResourceSnapshot`]s; failures are classified into
//! [`Transit511Error`] variants. Nothing is cached here.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain::ResourceKey;
//! use integration_511::{MonitoringClient, Transit511Client, Transit511Config};
//!
//! let config = Transit511Config::with_api_key("my-key");
//! let client = Transit511Client::new(&config)?;
//!
//! let snapshot = client.fetch(&ResourceKey::stop("SF", "18031")?).await?;
//! println!("{} upcoming visits", snapshot.len());
//! ```

mod client;
mod config;
mod error;
mod models;

pub use client::{MonitoringClient, Transit511Client};
pub use config::Transit511Config;
pub use error::Transit511Error;
pub use models::parse_monitoring_response;

/// Body prefix the 511 API sends instead of JSON once the quota is used up
pub const RATE_LIMIT_SENTENCE: &str = "The allowed number of requests";
