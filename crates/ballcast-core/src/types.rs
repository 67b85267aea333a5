//! Core types for Ballcast

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a scheduled game, unique within one schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a media feed, unique within its event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeedId(pub u64);

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Activation state of a feed as reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedState {
    Inactive,
    Active,
    Ended,
}

impl FeedState {
    /// Map the stats API `mediaState` string
    pub fn from_media_state(state: &str) -> Self {
        match state {
            "MEDIA_ON" => FeedState::Active,
            "MEDIA_ARCHIVE" => FeedState::Ended,
            _ => FeedState::Inactive,
        }
    }
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedState::Inactive => write!(f, "inactive"),
            FeedState::Active => write!(f, "active"),
            FeedState::Ended => write!(f, "ended"),
        }
    }
}

/// One candidate video feed for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFeed {
    pub id: FeedId,
    pub state: FeedState,
    /// Broadcast type, e.g. HOME or AWAY
    pub kind: String,
    /// Short display label (call letters)
    pub label: String,
}

impl MediaFeed {
    pub fn is_active(&self) -> bool {
        self.state == FeedState::Active
    }
}

/// Team details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub abbreviation: String,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.abbreviation)
    }
}

/// Status of a game as reported by the stats API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub detailed_state: String,
    pub status_code: String,
}

impl GameStatus {
    pub fn has_started(&self) -> bool {
        !matches!(
            self.detailed_state.as_str(),
            "Scheduled"
                | "Postponed"
                | "Pre-Game"
                | "Warmup"
                | "Delayed Start: Rain"
                | "Delayed Start: Lightning"
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.detailed_state.as_str(),
            "In Progress" | "Warmup" | "Delayed: Rain"
        )
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.detailed_state.as_str(), "Game Over" | "Final")
    }

    pub fn is_delayed_or_suspended(&self) -> bool {
        matches!(
            self.detailed_state.as_str(),
            "Ceremony" | "Suspended: Rain" | "Delayed: Rain"
        )
    }

    /// Scheduled, pre-game or warmup
    pub fn is_pregame(&self) -> bool {
        matches!(self.status_code.as_str(), "S" | "P" | "PW")
    }
}

/// Current state of play
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineScore {
    pub inning_state: String,
    pub inning_ordinal: String,
    pub away_runs: u32,
    pub home_runs: u32,
}

/// Display data for an event. Not interpreted by the prober.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub away: Team,
    pub home: Team,
    pub status: GameStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub line_score: Option<LineScore>,
}

impl Matchup {
    /// True if either team has the given abbreviation (case-insensitive)
    pub fn involves(&self, abbreviation: &str) -> bool {
        self.away.abbreviation.eq_ignore_ascii_case(abbreviation)
            || self.home.abbreviation.eq_ignore_ascii_case(abbreviation)
    }
}

/// One scheduled game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Date used to build manifest URLs
    pub date: NaiveDate,
    pub feeds: Vec<MediaFeed>,
    pub matchup: Matchup,
}

impl Event {
    pub fn new(id: EventId, date: NaiveDate) -> Self {
        Self {
            id,
            date,
            feeds: Vec::new(),
            matchup: Matchup::default(),
        }
    }

    pub fn with_feed(mut self, feed: MediaFeed) -> Self {
        self.feeds.push(feed);
        self
    }

    pub fn active_feeds(&self) -> impl Iterator<Item = &MediaFeed> {
        self.feeds.iter().filter(|f| f.is_active())
    }
}

/// A full day's schedule, rebuilt on every refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    pub events: Vec<Event>,
    pub total_games_in_progress: u32,
    pub fetched_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(date: NaiveDate, events: Vec<Event>) -> Self {
        Self {
            date,
            events,
            total_games_in_progress: 0,
            fetched_at: Utc::now(),
        }
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn has_completed_games(&self) -> bool {
        self.events.iter().any(|e| e.matchup.status.is_complete())
    }

    pub fn has_games_in_progress(&self) -> bool {
        self.total_games_in_progress > 0
    }

    /// Number of feeds the aggregator would probe
    pub fn active_feed_count(&self) -> usize {
        self.events.iter().map(|e| e.active_feeds().count()).sum()
    }
}

/// Prober output for one feed with a playable stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub event_id: EventId,
    pub feed_id: FeedId,
    /// Validated manifest content, never empty
    pub playlist: String,
    pub kind: String,
    pub label: String,
}

impl StreamRecord {
    pub fn new(event: &Event, feed: &MediaFeed, playlist: String) -> Self {
        Self {
            event_id: event.id,
            feed_id: feed.id,
            playlist,
            kind: feed.kind.clone(),
            label: feed.label.clone(),
        }
    }
}

impl std::fmt::Display for StreamRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.kind, self.label)
    }
}
