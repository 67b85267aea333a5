//! Event catalog - the day's schedule from the stats API

use crate::{
    config::{Config, DATE_PLACEHOLDER},
    types::{
        Event, EventId, FeedId, FeedState, GameStatus, LineScore, Matchup, MediaFeed, Schedule,
        Team,
    },
    Error, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use reqwest::Client;
use tracing::{debug, instrument};

/// Games still running after midnight stay on the previous day's schedule
/// until this local hour has passed.
const DAY_ROLLOVER_HOUR: u32 = 3;

/// Source of the current schedule
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn load(&self) -> Result<Schedule>;
}

/// Schedule date for a local time
pub fn schedule_date(now: DateTime<Local>) -> NaiveDate {
    let today = now.date_naive();
    if now.hour() <= DAY_ROLLOVER_HOUR {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    }
}

/// Catalog backed by the stats API
pub struct StatsApiCatalog {
    client: Client,
    url_template: String,
    feed_category: String,
    date: Option<NaiveDate>,
}

impl StatsApiCatalog {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url_template: config.stats_url.clone(),
            feed_category: config.feed_category.clone(),
            date: None,
        }
    }

    /// Always load the given date instead of following the clock
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn schedule_url(&self, date: NaiveDate) -> String {
        self.url_template
            .replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
    }
}

#[async_trait]
impl EventCatalog for StatsApiCatalog {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Schedule> {
        let date = self.date.unwrap_or_else(|| schedule_date(Local::now()));
        let url = self.schedule_url(date);

        debug!(url = %url, date = %date, "Fetching schedule");

        let fetch_error = |source| Error::CatalogFetch {
            url: url.clone(),
            source,
        };

        let body = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?
            .text()
            .await
            .map_err(fetch_error)?;

        let schedule = parse_schedule(&body, date, &self.feed_category)?;

        debug!(
            events = schedule.events.len(),
            active_feeds = schedule.active_feed_count(),
            "Schedule loaded"
        );

        Ok(schedule)
    }
}

/// Decode a stats API schedule document.
///
/// Only media items listed under `feed_category` become feeds. A document
/// without any dates is an empty schedule.
pub fn parse_schedule(body: &str, date: NaiveDate, feed_category: &str) -> Result<Schedule> {
    let data: wire::Data =
        serde_json::from_str(body).map_err(|e| Error::CatalogDecode(e.to_string()))?;

    let day = data.dates.into_iter().next();
    let total_games_in_progress = data
        .total_games_in_progress
        .or_else(|| day.as_ref().and_then(|d| d.total_games_in_progress))
        .unwrap_or(0);

    let events = day
        .map(|d| d.games)
        .unwrap_or_default()
        .into_iter()
        .map(|game| game.into_event(date, feed_category))
        .collect();

    let mut schedule = Schedule::new(date, events);
    schedule.total_games_in_progress = total_games_in_progress;
    Ok(schedule)
}

mod wire {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Data {
        #[serde(default)]
        pub dates: Vec<DateEntry>,
        pub total_games_in_progress: Option<u32>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DateEntry {
        #[serde(default)]
        pub games: Vec<Game>,
        pub total_games_in_progress: Option<u32>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Game {
        pub game_pk: u64,
        #[serde(default)]
        pub teams: Teams,
        #[serde(default)]
        pub status: Status,
        pub game_date: Option<String>,
        #[serde(default)]
        pub content: Content,
        pub linescore: Option<Linescore>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Teams {
        #[serde(default)]
        pub away: Side,
        #[serde(default)]
        pub home: Side,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Side {
        #[serde(default)]
        pub team: WireTeam,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct WireTeam {
        #[serde(rename = "teamName", default)]
        pub name: String,
        #[serde(default)]
        pub abbreviation: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Status {
        #[serde(default)]
        pub detailed_state: String,
        #[serde(default)]
        pub status_code: String,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Content {
        #[serde(default)]
        pub media: Media,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Media {
        #[serde(default)]
        pub epg: Vec<Epg>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Epg {
        #[serde(default)]
        pub title: String,
        #[serde(default)]
        pub items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Item {
        pub id: u64,
        #[serde(default)]
        pub media_state: String,
        #[serde(default)]
        pub media_feed_type: String,
        #[serde(default)]
        pub call_letters: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Linescore {
        #[serde(default)]
        pub current_inning_ordinal: String,
        #[serde(default)]
        pub inning_state: String,
        #[serde(default)]
        pub teams: LinescoreTeams,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct LinescoreTeams {
        #[serde(default)]
        pub home: Runs,
        #[serde(default)]
        pub away: Runs,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Runs {
        #[serde(default)]
        pub runs: u32,
    }

    impl Game {
        pub fn into_event(self, date: NaiveDate, feed_category: &str) -> Event {
            let feeds = self
                .content
                .media
                .epg
                .into_iter()
                .filter(|epg| epg.title == feed_category)
                .flat_map(|epg| epg.items)
                .map(|item| MediaFeed {
                    id: FeedId(item.id),
                    state: FeedState::from_media_state(&item.media_state),
                    kind: item.media_feed_type,
                    label: item.call_letters,
                })
                .collect();

            let start_time = self
                .game_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc));

            let line_score = self.linescore.map(|l| LineScore {
                inning_state: l.inning_state,
                inning_ordinal: l.current_inning_ordinal,
                away_runs: l.teams.away.runs,
                home_runs: l.teams.home.runs,
            });

            Event {
                id: EventId(self.game_pk),
                date,
                feeds,
                matchup: Matchup {
                    away: Team {
                        name: self.teams.away.team.name,
                        abbreviation: self.teams.away.team.abbreviation,
                    },
                    home: Team {
                        name: self.teams.home.team.name,
                        abbreviation: self.teams.home.team.abbreviation,
                    },
                    status: GameStatus {
                        detailed_state: self.status.detailed_state,
                        status_code: self.status.status_code,
                    },
                    start_time,
                    line_score,
                },
            }
        }
    }
}
