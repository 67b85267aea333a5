//! Ballcast Core - live game stream availability
//!
//! This crate provides the pieces behind the Ballcast scoreboard:
//! - Schedule loading from the stats API
//! - Manifest probing across an ordered list of CDN variants
//! - Concurrent fan-out of probes over every active feed
//! - Immutable availability snapshots, republished on every refresh
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Ballcast Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐         ┌──────────────────────────┐          │
//! │  │    Event     │ events  │      Availability        │          │
//! │  │   Catalog    ├────────►│       Aggregator         │          │
//! │  └──────────────┘         └──────┬─────────────┬─────┘          │
//! │                          one task│per feed     │ mpsc           │
//! │                           ┌──────┴──────┐      │                │
//! │                           │   Stream    │──────┘                │
//! │                           │   Prober    │                       │
//! │                           └──────┬──────┘                       │
//! │                                  │                              │
//! │                           ┌──────┴──────┐   ┌──────────────┐    │
//! │                           │  Manifest   │   │  Refresh     │    │
//! │                           │  Fetcher    │   │  Loop        │    │
//! │                           └─────────────┘   └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod prober;
pub mod refresh;
pub mod snapshot;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregator::AvailabilityAggregator;
pub use catalog::{EventCatalog, StatsApiCatalog};
pub use config::{Config, ProberConfig, ProxyConfig};
pub use error::{Error, FetchError, Result};
pub use prober::{
    HttpManifestFetcher, ManifestFetcher, ProbeFailure, StreamProber, VariantFailure,
    VariantFailureReason,
};
pub use refresh::{RefreshLoop, RefreshState};
pub use snapshot::{AvailabilitySnapshot, RefreshStats};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent with every outbound request
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.100 Safari/537.36";

/// Build the HTTP client shared by the catalog and every probe.
///
/// Connections are pooled across probes; the client itself is never
/// mutated after construction.
pub fn http_client(config: &ProberConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(Error::from)
}
