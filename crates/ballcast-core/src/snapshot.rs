//! Availability snapshot produced by one refresh cycle

use crate::types::{EventId, FeedId, StreamRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Probe counters for one refresh cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    /// Active feeds a probe was launched for
    pub probed: usize,
    pub available: usize,
    pub unavailable: usize,
    /// Probes where every variant failed at the transport layer
    pub systemic_failures: usize,
}

impl RefreshStats {
    /// Every probe failed at the transport layer
    pub fn is_outage(&self) -> bool {
        self.probed > 0 && self.systemic_failures == self.probed
    }
}

/// Playable streams by event, then by feed.
///
/// Built once by the aggregator and never modified afterwards. An event
/// without any playable feed has no entry.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilitySnapshot {
    streams: HashMap<EventId, HashMap<FeedId, StreamRecord>>,
    refreshed_at: DateTime<Utc>,
    stats: RefreshStats,
}

impl Default for AvailabilitySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl AvailabilitySnapshot {
    pub fn empty() -> Self {
        Self {
            streams: HashMap::new(),
            refreshed_at: Utc::now(),
            stats: RefreshStats::default(),
        }
    }

    /// Build a snapshot from already-probed records
    pub fn from_records(records: impl IntoIterator<Item = StreamRecord>, stats: RefreshStats) -> Self {
        let mut snapshot = Self::empty();
        for record in records {
            snapshot.insert(record);
        }
        snapshot.finish(stats)
    }

    pub(crate) fn insert(&mut self, record: StreamRecord) {
        self.streams
            .entry(record.event_id)
            .or_default()
            .insert(record.feed_id, record);
    }

    pub(crate) fn finish(mut self, stats: RefreshStats) -> Self {
        self.streams.retain(|_, feeds| !feeds.is_empty());
        self.stats = stats;
        self.refreshed_at = Utc::now();
        self
    }

    /// Streams of one event, keyed by feed
    pub fn get(&self, event: EventId) -> Option<&HashMap<FeedId, StreamRecord>> {
        self.streams.get(&event)
    }

    pub fn stream(&self, event: EventId, feed: FeedId) -> Option<&StreamRecord> {
        self.streams.get(&event).and_then(|feeds| feeds.get(&feed))
    }

    /// Streams of one event ordered by feed id
    pub fn streams_for(&self, event: EventId) -> Vec<&StreamRecord> {
        let mut records: Vec<_> = self
            .streams
            .get(&event)
            .map(|feeds| feeds.values().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.feed_id);
        records
    }

    /// Total number of feeds with a playable stream
    pub fn stream_count(&self) -> usize {
        self.streams.values().map(HashMap::len).sum()
    }

    pub fn event_count(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamRecord> {
        self.streams.values().flat_map(HashMap::values)
    }

    /// Find streams by feed id or label, across all events.
    ///
    /// Labels are matched case-insensitively. Several events may carry a
    /// feed with the same label, so more than one record can match.
    pub fn find(&self, key: &str) -> Vec<&StreamRecord> {
        let key = key.trim();
        let mut matches: Vec<_> = self
            .iter()
            .filter(|r| r.feed_id.to_string() == key || r.label.eq_ignore_ascii_case(key))
            .collect();
        matches.sort_by_key(|r| (r.event_id, r.feed_id));
        matches
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: u64, feed: u64, label: &str) -> StreamRecord {
        StreamRecord {
            event_id: EventId(event),
            feed_id: FeedId(feed),
            playlist: format!("http://example/{}.m3u8", feed),
            kind: "HOME".into(),
            label: label.into(),
        }
    }

    fn snapshot() -> AvailabilitySnapshot {
        AvailabilitySnapshot::from_records(
            vec![record(1, 102, "WGN"), record(1, 101, "KSDK"), record(2, 201, "wgn")],
            RefreshStats {
                probed: 4,
                available: 3,
                unavailable: 1,
                systemic_failures: 0,
            },
        )
    }

    #[test]
    fn test_lookup() {
        let snapshot = snapshot();
        assert_eq!(snapshot.stream_count(), 3);
        assert_eq!(snapshot.event_count(), 2);
        assert_eq!(snapshot.get(EventId(1)).map(HashMap::len), Some(2));
        assert!(snapshot.get(EventId(3)).is_none());
        assert_eq!(
            snapshot.stream(EventId(2), FeedId(201)).map(|r| r.label.as_str()),
            Some("wgn")
        );
        assert!(snapshot.stream(EventId(2), FeedId(101)).is_none());
    }

    #[test]
    fn test_streams_for_is_ordered() {
        let snapshot = snapshot();
        let ids: Vec<_> = snapshot.streams_for(EventId(1)).iter().map(|r| r.feed_id).collect();
        assert_eq!(ids, vec![FeedId(101), FeedId(102)]);
        assert!(snapshot.streams_for(EventId(9)).is_empty());
    }

    #[test]
    fn test_find_by_label_and_id() {
        let snapshot = snapshot();

        let by_label: Vec<_> = snapshot.find("WGN").iter().map(|r| r.feed_id).collect();
        assert_eq!(by_label, vec![FeedId(102), FeedId(201)]);

        let by_id = snapshot.find("101");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].label, "KSDK");

        assert!(snapshot.find("ESPN").is_empty());
    }

    #[test]
    fn test_refreshed_at_is_set_when_finished() {
        let before = Utc::now();
        let snapshot = snapshot();
        assert!(snapshot.refreshed_at() >= before);
        assert!(snapshot.refreshed_at() <= Utc::now());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = AvailabilitySnapshot::empty().finish(RefreshStats::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.stream_count(), 0);
        assert!(!snapshot.stats().is_outage());
    }

    #[test]
    fn test_outage() {
        let stats = RefreshStats {
            probed: 3,
            available: 0,
            unavailable: 3,
            systemic_failures: 3,
        };
        assert!(stats.is_outage());
    }
}
