//! Configuration loading and validation

use crate::{Error, FeedId, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Placeholder for the event date in URL templates
pub const DATE_PLACEHOLDER: &str = "{date}";
/// Placeholder for the feed identifier in the manifest URL template
pub const FEED_PLACEHOLDER: &str = "{feedIdentifier}";
/// Placeholder for the CDN variant tag in the manifest URL template
pub const VARIANT_PLACEHOLDER: &str = "{cdnVariant}";

/// Local proxy the player routes manifest requests through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub source_domains: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            source_domains: String::new(),
            port: default_proxy_port(),
        }
    }
}

/// Application configuration, read from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Stats API URL with a `{date}` placeholder
    #[serde(rename = "statsURL", default)]
    pub stats_url: String,

    /// Manifest URL with `{date}`, `{feedIdentifier}` and `{cdnVariant}` placeholders
    #[serde(rename = "streamPlaylistURL", default)]
    pub stream_playlist_url: String,

    #[serde(default)]
    pub check_streams: bool,

    #[serde(default)]
    pub proxy: ProxyConfig,

    /// CDN variants in priority order; the first one serving a manifest wins
    #[serde(default = "default_cdn_variants")]
    pub cdn_variants: Vec<String>,

    /// Media category in the schedule whose items are probed
    #[serde(default = "default_feed_category")]
    pub feed_category: String,

    /// Body prefix the CDN returns when a feed has no stream
    #[serde(default = "default_unavailable_marker")]
    pub unavailable_marker: String,

    /// Rewrite the playlist scheme so the local proxy can intercept it
    #[serde(default = "default_true")]
    pub rewrite_https: bool,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_proxy_port() -> u16 {
    9876
}

fn default_cdn_variants() -> Vec<String> {
    vec!["akc".to_string(), "l3c".to_string()]
}

fn default_feed_category() -> String {
    "MLBTV".to_string()
}

fn default_unavailable_marker() -> String {
    "Not".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_refresh_interval_secs() -> u64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats_url: String::new(),
            stream_playlist_url: String::new(),
            check_streams: false,
            proxy: ProxyConfig::default(),
            cdn_variants: default_cdn_variants(),
            feed_category: default_feed_category(),
            unavailable_marker: default_unavailable_marker(),
            rewrite_https: default_true(),
            request_timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required keys. Stream-related keys are only required when
    /// stream checking is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.stats_url.is_empty() {
            return Err(Error::InvalidConfig(
                "Set statsURL in configuration file".into(),
            ));
        }

        if self.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "refreshIntervalSecs must be greater than zero".into(),
            ));
        }

        if !self.check_streams {
            return Ok(());
        }

        if self.stream_playlist_url.is_empty() {
            return Err(Error::InvalidConfig(
                "Set streamPlaylistURL in configuration file".into(),
            ));
        }
        if self.proxy.domain.is_empty() {
            return Err(Error::InvalidConfig(
                "Set proxy domain in configuration file".into(),
            ));
        }
        if self.proxy.source_domains.is_empty() {
            return Err(Error::InvalidConfig(
                "Set proxy sourceDomains in configuration file".into(),
            ));
        }

        self.prober_config().validate()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Settings consumed by the stream prober
    pub fn prober_config(&self) -> ProberConfig {
        ProberConfig {
            url_template: self.stream_playlist_url.clone(),
            cdn_variants: self.cdn_variants.clone(),
            unavailable_marker: self.unavailable_marker.clone(),
            rewrite_https: self.rewrite_https,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Settings for probing one feed across CDN variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProberConfig {
    pub url_template: String,
    pub cdn_variants: Vec<String>,
    pub unavailable_marker: String,
    pub rewrite_https: bool,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Config::default().prober_config()
    }
}

impl ProberConfig {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            ..Default::default()
        }
    }

    pub fn with_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cdn_variants = variants.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rewrite_https(mut self, rewrite: bool) -> Self {
        self.rewrite_https = rewrite;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cdn_variants.is_empty() {
            return Err(Error::InvalidConfig(
                "cdnVariants must list at least one variant".into(),
            ));
        }
        if self.cdn_variants.iter().any(|v| v.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "cdnVariants must not contain empty entries".into(),
            ));
        }
        if self.unavailable_marker.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "unavailableMarker must not be empty".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "requestTimeoutSecs must be greater than zero".into(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "connectTimeoutSecs must be greater than zero".into(),
            ));
        }
        for placeholder in [DATE_PLACEHOLDER, FEED_PLACEHOLDER, VARIANT_PLACEHOLDER] {
            if !self.url_template.contains(placeholder) {
                return Err(Error::InvalidConfig(format!(
                    "streamPlaylistURL must contain {}",
                    placeholder
                )));
            }
        }

        let sample = self.manifest_url(
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            FeedId(0),
            &self.cdn_variants[0],
        );
        Url::parse(&sample)
            .map_err(|e| Error::InvalidUrl(format!("streamPlaylistURL: {}", e)))?;

        Ok(())
    }

    /// Expand the manifest URL template
    pub fn manifest_url(&self, date: NaiveDate, feed: FeedId, variant: &str) -> String {
        self.url_template
            .replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
            .replace(FEED_PLACEHOLDER, &feed.to_string())
            .replace(VARIANT_PLACEHOLDER, variant)
    }
}
