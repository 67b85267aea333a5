//! Availability aggregation - concurrent probe fan-out
//!
//! Every active feed of every event gets its own task. Tasks report to a
//! single collector over a channel, and only the collector touches the
//! snapshot under construction. The snapshot is handed back once every
//! task has finished, so callers never see a partial result.

use crate::{
    prober::{ProbeFailure, StreamProber},
    snapshot::{AvailabilitySnapshot, RefreshStats},
    types::{Event, EventId, FeedId, StreamRecord},
    Error, Result,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Buffered outcomes between probe tasks and the collector
const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// What one probe task reports back
#[derive(Debug)]
enum ProbeOutcome {
    Found(StreamRecord),
    Missing {
        event: EventId,
        feed: FeedId,
        failure: ProbeFailure,
    },
    Cancelled,
}

/// Runs the stream prober over a whole schedule
#[derive(Clone)]
pub struct AvailabilityAggregator {
    prober: StreamProber,
}

impl AvailabilityAggregator {
    pub fn new(prober: StreamProber) -> Self {
        Self { prober }
    }

    /// Probe every active feed concurrently and build a fresh snapshot.
    ///
    /// Per-feed failures only leave the feed out of the snapshot. The call
    /// fails only when `token` is cancelled, in which case in-flight
    /// requests are dropped and nothing is returned.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn refresh(
        &self,
        events: &[Event],
        token: &CancellationToken,
    ) -> Result<AvailabilitySnapshot> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let mut tasks = JoinSet::new();

        for event in events {
            let shared = Arc::new(event.clone());

            for feed in event.active_feeds() {
                let event = shared.clone();
                let feed = feed.clone();
                let prober = self.prober.clone();
                let token = token.clone();
                let tx = tx.clone();

                tasks.spawn(async move {
                    let outcome = tokio::select! {
                        _ = token.cancelled() => ProbeOutcome::Cancelled,
                        result = prober.probe_feed(&event, &feed) => match result {
                            Ok(record) => ProbeOutcome::Found(record),
                            Err(failure) => ProbeOutcome::Missing {
                                event: event.id,
                                feed: feed.id,
                                failure,
                            },
                        },
                    };
                    // The collector outlives every task
                    let _ = tx.send(outcome).await;
                });
            }
        }

        // Only task-held senders remain, so the channel closes when the last task ends
        drop(tx);

        let mut snapshot = AvailabilitySnapshot::empty();
        let mut stats = RefreshStats {
            probed: tasks.len(),
            ..Default::default()
        };
        let mut cancelled = false;

        while let Some(outcome) = rx.recv().await {
            match outcome {
                ProbeOutcome::Found(record) => {
                    debug!(
                        event = %record.event_id,
                        feed = %record.feed_id,
                        label = %record.label,
                        "Stream available"
                    );
                    stats.available += 1;
                    snapshot.insert(record);
                }
                ProbeOutcome::Missing {
                    event,
                    feed,
                    failure,
                } => {
                    debug!(event = %event, feed = %feed, failure = %failure, "No stream");
                    stats.unavailable += 1;
                    if failure.is_systemic() {
                        stats.systemic_failures += 1;
                    }
                }
                ProbeOutcome::Cancelled => cancelled = true,
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Probe task failed");
            }
        }

        if cancelled || token.is_cancelled() {
            info!("Stream check cancelled");
            return Err(Error::Cancelled);
        }

        if stats.is_outage() {
            warn!(
                probed = stats.probed,
                "Every stream probe failed at the network level"
            );
        }

        info!(
            probed = stats.probed,
            available = stats.available,
            unavailable = stats.unavailable,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stream check complete"
        );

        Ok(snapshot.finish(stats))
    }
}
