//! Output formatting for CLI

use ballcast_core::{Event, Matchup, RefreshState, Schedule, StreamRecord};
use chrono::Local;
use tabled::{builder::Builder, settings::Style};

pub const HELP: &str = "[call letters or feed id] = play stream\nr = refresh\nh = help\nq = quit";

fn teams(matchup: &Matchup, single_line: bool) -> String {
    let delim = if single_line { " vs " } else { "\n" };
    format!("{}{}{}", matchup.away, delim, matchup.home)
}

fn score(matchup: &Matchup) -> String {
    match &matchup.line_score {
        Some(line) if matchup.status.has_started() => {
            format!("{}\n{}", line.away_runs, line.home_runs)
        }
        _ => String::new(),
    }
}

fn status(matchup: &Matchup) -> String {
    let status = &matchup.status;

    if status.is_pregame() {
        let mut display = matchup
            .start_time
            .map(|t| t.with_timezone(&Local).format("%-I:%M%p").to_string())
            .unwrap_or_else(|| status.detailed_state.clone());
        if status.status_code == "PW" {
            display.push('\n');
            display.push_str(&status.detailed_state);
        }
        return display;
    }

    if status.is_active() {
        if let Some(line) = &matchup.line_score {
            let inning: String = line.inning_state.chars().take(3).collect();
            let mut display = format!("{} {}", inning, line.inning_ordinal);
            if status.is_delayed_or_suspended() {
                display.push('\n');
                display.push_str(&status.detailed_state);
            }
            return display;
        }
    }

    status.detailed_state.clone()
}

fn streams(records: &[&StreamRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scoreboard for the latest refresh, optionally limited to one team
pub fn scoreboard(state: &RefreshState, team: Option<&str>, check_streams: bool) -> String {
    let schedule = &state.schedule;
    let snapshot = &state.snapshot;

    let show_score = schedule.has_completed_games() || schedule.has_games_in_progress();
    let show_streams = check_streams && !snapshot.is_empty();

    let mut out = format!(
        "Scoreboard for {} (as of {})\n",
        schedule.date,
        snapshot
            .refreshed_at()
            .with_timezone(&Local)
            .format("%-I:%M%p")
    );

    let games: Vec<&Event> = schedule
        .events
        .iter()
        .filter(|e| team.map_or(true, |t| e.matchup.involves(t)))
        .collect();

    if games.is_empty() {
        out.push_str("No Games\n");
        return out;
    }

    let mut builder = Builder::default();

    let mut header = vec!["Game".to_string()];
    if show_score {
        header.push("R".to_string());
    }
    header.push("Status".to_string());
    if show_streams {
        header.push("Streams".to_string());
    }
    builder.push_record(header);

    for event in games {
        let mut row = vec![teams(&event.matchup, false)];
        if show_score {
            row.push(score(&event.matchup));
        }
        row.push(status(&event.matchup));
        if show_streams {
            row.push(streams(&snapshot.streams_for(event.id)));
        }
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    out.push_str(&table.to_string());
    out.push('\n');

    if check_streams && snapshot.is_empty() {
        out.push_str("No streams available.\n");
    }

    out
}

/// Disambiguation table when a key matches streams in several games
pub fn stream_chooser(records: &[&StreamRecord], schedule: &Schedule) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    builder.push_record(["Feed".to_string(), "Game".to_string()]);
    for record in records {
        let game = schedule
            .event(record.event_id)
            .map(|e| teams(&e.matchup, true))
            .unwrap_or_default();
        builder.push_record([record.feed_id.to_string(), game]);
    }

    let mut table = builder.build();
    table.with(Style::modern());

    format!("Multiple games for {}...\n{}", first, table)
}

/// Line shown when playback starts
pub fn starting(record: &StreamRecord, schedule: &Schedule) -> String {
    match schedule.event(record.event_id) {
        Some(event) => format!("Starting {} stream for {}...", record, teams(&event.matchup, true)),
        None => format!("Starting {} stream...", record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballcast_core::{
        AvailabilitySnapshot, EventId, FeedId, GameStatus, LineScore, RefreshStats, Team,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn event(id: u64, away: &str, home: &str, status: (&str, &str)) -> Event {
        let mut event = Event::new(EventId(id), date());
        event.matchup = Matchup {
            away: Team {
                name: away.into(),
                abbreviation: away[..3].to_uppercase(),
            },
            home: Team {
                name: home.into(),
                abbreviation: home[..3].to_uppercase(),
            },
            status: GameStatus {
                detailed_state: status.0.into(),
                status_code: status.1.into(),
            },
            start_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 23, 5, 0).unwrap()),
            line_score: Some(LineScore {
                inning_state: "Bottom".into(),
                inning_ordinal: "7th".into(),
                away_runs: 4,
                home_runs: 2,
            }),
        };
        event
    }

    fn record(event: u64, feed: u64, label: &str) -> StreamRecord {
        StreamRecord {
            event_id: EventId(event),
            feed_id: FeedId(feed),
            playlist: "http://example/stream.m3u8".into(),
            kind: "HOME".into(),
            label: label.into(),
        }
    }

    fn state(records: Vec<StreamRecord>) -> RefreshState {
        let mut schedule = Schedule::new(
            date(),
            vec![
                event(1, "Cubs", "Cardinals", ("In Progress", "I")),
                event(2, "Yankees", "Red Sox", ("Scheduled", "S")),
            ],
        );
        schedule.total_games_in_progress = 1;
        RefreshState {
            schedule,
            snapshot: AvailabilitySnapshot::from_records(records, RefreshStats::default()),
        }
    }

    #[test]
    fn test_scoreboard_with_streams() {
        let state = state(vec![record(1, 101, "WGN")]);
        let out = scoreboard(&state, None, true);

        let as_of = state
            .snapshot
            .refreshed_at()
            .with_timezone(&Local)
            .format("%-I:%M%p")
            .to_string();
        assert!(out.starts_with(&format!("Scoreboard for 2024-05-01 (as of {})", as_of)));
        assert!(out.contains("Cubs (CUB)"));
        assert!(out.contains("Bot 7th"));
        assert!(out.contains("HOME [WGN]"));
        assert!(out.contains("Streams"));
        assert!(!out.contains("No streams available."));
    }

    #[test]
    fn test_scoreboard_without_streams() {
        let out = scoreboard(&state(Vec::new()), None, true);
        assert!(out.contains("No streams available."));
        assert!(!out.contains("Streams"));

        let out = scoreboard(&state(Vec::new()), None, false);
        assert!(!out.contains("No streams available."));
    }

    #[test]
    fn test_scoreboard_team_filter() {
        let out = scoreboard(&state(Vec::new()), Some("yan"), false);
        assert!(out.contains("Yankees"));
        assert!(!out.contains("Cubs"));

        let out = scoreboard(&state(Vec::new()), Some("NYM"), false);
        assert!(out.contains("No Games"));
    }

    #[test]
    fn test_status_display() {
        let live = event(1, "Cubs", "Cardinals", ("In Progress", "I"));
        assert_eq!(status(&live.matchup), "Bot 7th");
        assert_eq!(score(&live.matchup), "4\n2");

        let done = event(1, "Cubs", "Cardinals", ("Final", "F"));
        assert_eq!(status(&done.matchup), "Final");

        let scheduled = event(1, "Cubs", "Cardinals", ("Scheduled", "S"));
        assert_eq!(score(&scheduled.matchup), "");
        assert!(status(&scheduled.matchup).ends_with('M'));
    }

    #[test]
    fn test_stream_chooser() {
        let state = state(Vec::new());
        let a = record(1, 101, "WGN");
        let b = record(2, 201, "WGN");
        let out = stream_chooser(&[&a, &b], &state.schedule);

        assert!(out.starts_with("Multiple games for HOME [WGN]"));
        assert!(out.contains("101"));
        assert!(out.contains("Yankees (YAN) vs Red Sox (RED)"));
    }

    #[test]
    fn test_starting() {
        let state = state(Vec::new());
        let out = starting(&record(1, 101, "WGN"), &state.schedule);
        assert_eq!(out, "Starting HOME [WGN] stream for Cubs (CUB) vs Cardinals (CAR)...");
    }
}
