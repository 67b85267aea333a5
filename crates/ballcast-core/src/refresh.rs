//! Periodic schedule + availability refresh
//!
//! Each cycle loads the schedule, probes its feeds and publishes the pair
//! as one immutable [`RefreshState`]. A failed cycle publishes nothing, so
//! readers keep the last good state until the next attempt.

use crate::{
    aggregator::AvailabilityAggregator,
    catalog::EventCatalog,
    snapshot::AvailabilitySnapshot,
    types::Schedule,
    Error, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Schedule and stream availability from the same cycle
#[derive(Debug, Clone)]
pub struct RefreshState {
    pub schedule: Schedule,
    pub snapshot: AvailabilitySnapshot,
}

/// Drives refresh cycles and publishes their results
pub struct RefreshLoop {
    catalog: Arc<dyn EventCatalog>,
    /// `None` when stream checking is disabled
    aggregator: Option<AvailabilityAggregator>,
    interval: Duration,
    state_tx: watch::Sender<Option<Arc<RefreshState>>>,
}

impl RefreshLoop {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        aggregator: Option<AvailabilityAggregator>,
        interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            catalog,
            aggregator,
            interval,
            state_tx,
        }
    }

    /// Subscribe to published states
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<RefreshState>>> {
        self.state_tx.subscribe()
    }

    /// Latest published state, if any cycle has succeeded yet
    pub fn current(&self) -> Option<Arc<RefreshState>> {
        self.state_tx.borrow().clone()
    }

    pub fn checks_streams(&self) -> bool {
        self.aggregator.is_some()
    }

    /// Run one cycle. On failure the previously published state is kept.
    #[instrument(skip_all)]
    pub async fn refresh_once(&self, token: &CancellationToken) -> Result<Arc<RefreshState>> {
        let loaded = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            loaded = self.catalog.load() => loaded,
        };

        let schedule = match loaded {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Schedule refresh failed, keeping previous state");
                return Err(e);
            }
        };

        let snapshot = match &self.aggregator {
            Some(aggregator) => aggregator.refresh(&schedule.events, token).await?,
            None => AvailabilitySnapshot::empty(),
        };

        info!(
            date = %schedule.date,
            events = schedule.events.len(),
            streams = snapshot.stream_count(),
            "Refresh complete"
        );

        let state = Arc::new(RefreshState { schedule, snapshot });
        self.state_tx.send_replace(Some(state.clone()));
        Ok(state)
    }

    /// Refresh on every interval tick until cancelled. The first tick is
    /// one full interval away; callers run the startup refresh themselves.
    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    match self.refresh_once(&token).await {
                        Ok(_) => {}
                        Err(Error::Cancelled) => break,
                        // Already logged; the next tick retries
                        Err(_) => {}
                    }
                }
            }
        }

        info!("Refresh loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProberConfig;
    use crate::prober::StreamProber;
    use crate::testing::{ScriptedCatalog, ScriptedFetcher, TEMPLATE};
    use crate::types::{Event, EventId, FeedId, FeedState, MediaFeed};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn schedule(state: FeedState) -> Schedule {
        let event = Event::new(EventId(1), date()).with_feed(MediaFeed {
            id: FeedId(101),
            state,
            kind: "HOME".into(),
            label: "WGN".into(),
        });
        Schedule::new(date(), vec![event])
    }

    fn aggregator(fetcher: &Arc<ScriptedFetcher>) -> AvailabilityAggregator {
        AvailabilityAggregator::new(StreamProber::new(
            fetcher.clone(),
            ProberConfig::new(TEMPLATE),
        ))
    }

    fn fetcher() -> Arc<ScriptedFetcher> {
        let url = ProberConfig::new(TEMPLATE).manifest_url(date(), FeedId(101), "akc");
        Arc::new(ScriptedFetcher::new().respond(&url, "https://example/101.m3u8"))
    }

    #[tokio::test]
    async fn test_refresh_publishes_state() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![Ok(schedule(FeedState::Active))]));
        let refresher = RefreshLoop::new(catalog, Some(aggregator(&fetcher())), Duration::from_secs(60));
        let mut rx = refresher.subscribe();
        assert!(refresher.current().is_none());

        refresher.refresh_once(&CancellationToken::new()).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone().unwrap();
        assert_eq!(state.schedule.events.len(), 1);
        assert_eq!(state.snapshot.stream_count(), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_keeps_previous_state() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![
            Ok(schedule(FeedState::Active)),
            Err(Error::CatalogDecode("truncated".into())),
        ]));
        let refresher = RefreshLoop::new(catalog, Some(aggregator(&fetcher())), Duration::from_secs(60));
        let token = CancellationToken::new();

        let first = refresher.refresh_once(&token).await.unwrap();
        let err = refresher.refresh_once(&token).await.unwrap_err();

        assert!(matches!(err, Error::CatalogDecode(_)));
        let current = refresher.current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.snapshot.stream_count(), 1);
    }

    #[tokio::test]
    async fn test_ended_feed_is_dropped_on_next_cycle() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![
            Ok(schedule(FeedState::Active)),
            Ok(schedule(FeedState::Ended)),
        ]));
        let refresher = RefreshLoop::new(catalog, Some(aggregator(&fetcher())), Duration::from_secs(60));
        let token = CancellationToken::new();

        let first = refresher.refresh_once(&token).await.unwrap();
        let second = refresher.refresh_once(&token).await.unwrap();

        assert_eq!(first.snapshot.stream_count(), 1);
        assert!(second.snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_stream_checks_disabled() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![Ok(schedule(FeedState::Active))]));
        let refresher = RefreshLoop::new(catalog, None, Duration::from_secs(60));
        assert!(!refresher.checks_streams());

        let state = refresher.refresh_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(state.schedule.events.len(), 1);
        assert!(state.snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_run_refreshes_until_cancelled() {
        let catalog = Arc::new(ScriptedCatalog::repeating(schedule(FeedState::Active)));
        let refresher = Arc::new(RefreshLoop::new(
            catalog.clone(),
            Some(aggregator(&fetcher())),
            Duration::from_millis(20),
        ));
        let token = CancellationToken::new();

        let handle = {
            let refresher = refresher.clone();
            let token = token.clone();
            tokio::spawn(async move { refresher.run(token).await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(catalog.loads() >= 2);
        assert!(refresher.current().is_some());
    }
}
