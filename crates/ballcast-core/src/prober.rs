//! Stream probing across CDN variants
//!
//! A probe tries each configured CDN variant in order and stops at the
//! first one that serves a manifest. A body starting with the unavailable
//! marker, an empty body, or any transport failure moves on to the next
//! variant. Running out of variants is a routine outcome, reported as a
//! [`ProbeFailure`] rather than an [`Error`](crate::Error).

use crate::{
    config::ProberConfig,
    error::FetchError,
    types::{Event, FeedId, MediaFeed, StreamRecord},
    Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Fetches a manifest body for one URL
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Manifest fetcher backed by a shared, pooled HTTP client
#[derive(Clone)]
pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    pub fn new(config: &ProberConfig) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Why one CDN variant did not yield a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFailureReason {
    /// Body started with the unavailable marker
    Unavailable,
    /// Body was empty or whitespace
    Empty,
    Transport(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFailure {
    pub variant: String,
    pub reason: VariantFailureReason,
}

impl VariantFailure {
    pub fn is_systemic(&self) -> bool {
        matches!(&self.reason, VariantFailureReason::Transport(e) if e.is_systemic())
    }
}

/// Every variant was tried and none served a manifest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeFailure {
    /// One entry per variant, in the order they were tried
    pub attempts: Vec<VariantFailure>,
}

impl ProbeFailure {
    /// True when every attempt failed at the transport layer, which points
    /// at an outage rather than a feed with no stream.
    pub fn is_systemic(&self) -> bool {
        !self.attempts.is_empty() && self.attempts.iter().all(VariantFailure::is_systemic)
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no stream on {} variant(s)", self.attempts.len())?;
        for attempt in &self.attempts {
            match &attempt.reason {
                VariantFailureReason::Unavailable => write!(f, "; {}: unavailable", attempt.variant)?,
                VariantFailureReason::Empty => write!(f, "; {}: empty body", attempt.variant)?,
                VariantFailureReason::Transport(e) => write!(f, "; {}: {}", attempt.variant, e)?,
            }
        }
        Ok(())
    }
}

/// Decides whether a single feed currently has a playable stream
#[derive(Clone)]
pub struct StreamProber {
    fetcher: Arc<dyn ManifestFetcher>,
    config: Arc<ProberConfig>,
}

impl StreamProber {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>, config: ProberConfig) -> Self {
        Self {
            fetcher,
            config: Arc::new(config),
        }
    }

    /// Create a prober that talks HTTP with its own client
    pub fn http(config: ProberConfig) -> Result<Self> {
        let fetcher = HttpManifestFetcher::new(&config)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    /// Try each CDN variant in order and return the first valid playlist
    pub async fn probe(
        &self,
        date: NaiveDate,
        feed: FeedId,
    ) -> std::result::Result<String, ProbeFailure> {
        let mut failure = ProbeFailure::default();

        for variant in &self.config.cdn_variants {
            let url = self.config.manifest_url(date, feed, variant);

            let reason = match self.fetcher.fetch(&url).await {
                Ok(body) if body.trim().is_empty() => VariantFailureReason::Empty,
                Ok(body) if body.starts_with(&self.config.unavailable_marker) => {
                    VariantFailureReason::Unavailable
                }
                Ok(body) => {
                    debug!(feed = %feed, variant = %variant, url = %url, "Manifest found");
                    return Ok(self.rewrite(body));
                }
                Err(e) => VariantFailureReason::Transport(e),
            };

            debug!(feed = %feed, variant = %variant, url = %url, reason = ?reason, "Variant failed");
            failure.attempts.push(VariantFailure {
                variant: variant.clone(),
                reason,
            });
        }

        Err(failure)
    }

    /// Probe one feed of an event and build its record
    pub async fn probe_feed(
        &self,
        event: &Event,
        feed: &MediaFeed,
    ) -> std::result::Result<StreamRecord, ProbeFailure> {
        let playlist = self.probe(event.date, feed.id).await?;
        Ok(StreamRecord::new(event, feed, playlist))
    }

    /// Playlists are re-served through the local proxy, which only
    /// intercepts plain HTTP.
    fn rewrite(&self, body: String) -> String {
        if self.config.rewrite_https {
            body.replacen("https", "http", 1)
        } else {
            body
        }
    }
}
