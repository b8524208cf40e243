use std::fmt::Display;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EspnConfig;
use crate::error::UpstreamError;
use crate::http_client::{JsonRequest, fetch_text, non_empty_body};
use crate::model::{NextFixture, PlayerIdentity};
use crate::roster;
use crate::teams::{Team, canonical_abbreviation, find_team};

pub const ADAPTER: &str = "espn_schedule";

pub trait ScheduleSource: Send + Sync {
    /// Earliest fixture on or after today for the team; `Ok(None)` when the
    /// team is unknown or nothing is scheduled.
    fn fetch_next_fixture(
        &self,
        team_abbrev: &str,
        player_ref: Option<&str>,
    ) -> Result<Option<NextFixture>, UpstreamError>;

    /// Secondary lookup of the player's team through a different provider.
    fn search_team(&self, player: &PlayerIdentity) -> Result<Option<String>, UpstreamError>;
}

pub struct EspnSchedule {
    cfg: EspnConfig,
}

impl EspnSchedule {
    pub fn new(cfg: EspnConfig) -> Self {
        Self { cfg }
    }
}

impl ScheduleSource for EspnSchedule {
    fn fetch_next_fixture(
        &self,
        team_abbrev: &str,
        player_ref: Option<&str>,
    ) -> Result<Option<NextFixture>, UpstreamError> {
        if !self.cfg.schedule_enabled {
            return Ok(None);
        }
        let Some(team) = find_team(team_abbrev) else {
            debug!(adapter = ADAPTER, team = team_abbrev, "no schedule id for team");
            return Ok(None);
        };

        let url = format!("{}/teams/{}/schedule", self.cfg.base_url, team.espn_id);
        let body = fetch_text(&JsonRequest {
            adapter: ADAPTER,
            url: &url,
            query: &[("region", "us"), ("lang", "en"), ("contentorigin", "espn")],
            headers: &[],
            timeout: self.cfg.timeout,
        })?;
        let games = parse_schedule(&body)?;
        let next = select_next_fixture(&games, team, Local::now().date_naive(), &Local);
        info!(
            adapter = ADAPTER,
            team = team.abbr,
            player = player_ref.unwrap_or("-"),
            events = games.len(),
            found = next.is_some(),
            "schedule scanned"
        );
        Ok(next)
    }

    fn search_team(&self, player: &PlayerIdentity) -> Result<Option<String>, UpstreamError> {
        if !self.cfg.roster_search_enabled {
            return Ok(None);
        }
        roster::team_for_player(&self.cfg, &player.display_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledGame {
    pub kickoff: DateTime<Utc>,
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Competitor {
    /// Abbreviation as the provider spells it.
    pub abbreviation: String,
    pub is_home: bool,
}

pub fn parse_schedule(body: &str) -> Result<Vec<ScheduledGame>, UpstreamError> {
    let trimmed = non_empty_body(ADAPTER, body)?;
    let v: Value = serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::parse(ADAPTER, format!("invalid schedule json: {e}")))?;
    let Some(events) = v.get("events").and_then(|e| e.as_array()) else {
        return Ok(Vec::new());
    };
    Ok(events.iter().filter_map(parse_event).collect())
}

fn parse_event(v: &Value) -> Option<ScheduledGame> {
    let kickoff = parse_event_time(v.get("date")?.as_str()?)?;
    let competitors = v
        .get("competitions")?
        .as_array()?
        .first()?
        .get("competitors")?
        .as_array()?
        .iter()
        .filter_map(|c| {
            let team = c.get("team")?;
            let abbreviation = team
                .get("abbreviation")
                .or_else(|| team.get("shortDisplayName"))
                .and_then(|x| x.as_str())?
                .to_string();
            let is_home = c.get("homeAway").and_then(|x| x.as_str()) == Some("home");
            Some(Competitor {
                abbreviation,
                is_home,
            })
        })
        .collect();
    Some(ScheduledGame {
        kickoff,
        competitors,
    })
}

/// The provider omits seconds ("2025-10-22T02:00Z"), which RFC 3339 rejects.
pub fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = trimmed.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Walks the schedule in kickoff order and returns the first game whose local
/// calendar day is `today` or later.
pub fn select_next_fixture<Tz>(
    games: &[ScheduledGame],
    team: &Team,
    today: NaiveDate,
    tz: &Tz,
) -> Option<NextFixture>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut ordered: Vec<&ScheduledGame> = games.iter().collect();
    ordered.sort_by_key(|g| g.kickoff);

    for game in ordered {
        let local = game.kickoff.with_timezone(tz);
        if local.date_naive() < today {
            continue;
        }
        let is_us = |c: &&Competitor| canonical_abbreviation(&c.abbreviation) == Some(team.abbr);
        let Some(opponent) = game.competitors.iter().find(|c| !is_us(c)) else {
            continue;
        };
        let is_home = game
            .competitors
            .iter()
            .find(is_us)
            .map(|c| c.is_home)
            .unwrap_or(!opponent.is_home);
        let time = if local.hour() == 0 && local.minute() == 0 {
            "TBD".to_string()
        } else {
            local.format("%-I:%M %p").to_string()
        };
        return Some(NextFixture {
            opponent_abbreviation: canonical_abbreviation(&opponent.abbreviation)
                .map(|s| s.to_string())
                .unwrap_or_else(|| opponent.abbreviation.to_ascii_uppercase()),
            date: local.date_naive(),
            time,
            is_home,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(kickoff: &str, home: &str, away: &str) -> ScheduledGame {
        ScheduledGame {
            kickoff: parse_event_time(kickoff).unwrap(),
            competitors: vec![
                Competitor {
                    abbreviation: home.to_string(),
                    is_home: true,
                },
                Competitor {
                    abbreviation: away.to_string(),
                    is_home: false,
                },
            ],
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn event_times_without_seconds_parse() {
        let t = parse_event_time("2025-10-22T02:00Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2025-10-22T02:00:00+00:00");
        assert!(parse_event_time("2025-10-22T02:00:00Z").is_some());
        assert!(parse_event_time("tomorrow").is_none());
    }

    #[test]
    fn picks_earliest_future_game_regardless_of_input_order() {
        let gsw = find_team("GSW").unwrap();
        let games = vec![
            game("2025-11-20T03:00Z", "LAL", "GS"),
            game("2025-11-10T03:00Z", "GS", "BOS"),
            game("2025-11-14T00:30Z", "GS", "UTAH"),
        ];
        let next = select_next_fixture(&games, gsw, day(2025, 11, 12), &Utc).unwrap();
        assert_eq!(next.opponent_abbreviation, "UTA");
        assert!(next.is_home);
        assert_eq!(next.date, day(2025, 11, 14));
        assert_eq!(next.time, "12:30 AM");
    }

    #[test]
    fn game_later_today_counts_as_next() {
        let gsw = find_team("GSW").unwrap();
        let games = vec![game("2025-11-12T23:00Z", "NO", "GS")];
        let next = select_next_fixture(&games, gsw, day(2025, 11, 12), &Utc).unwrap();
        assert_eq!(next.opponent_abbreviation, "NOP");
        assert!(!next.is_home);
        assert_eq!(next.time, "11:00 PM");
    }

    #[test]
    fn midnight_kickoff_is_tbd() {
        let gsw = find_team("GSW").unwrap();
        let games = vec![game("2025-12-25T00:00Z", "GS", "LAL")];
        let next = select_next_fixture(&games, gsw, day(2025, 12, 1), &Utc).unwrap();
        assert_eq!(next.time, "TBD");
    }

    #[test]
    fn no_future_games_yields_none() {
        let gsw = find_team("GSW").unwrap();
        let games = vec![game("2025-11-10T03:00Z", "GS", "BOS")];
        assert!(select_next_fixture(&games, gsw, day(2025, 11, 12), &Utc).is_none());
        assert!(select_next_fixture(&[], gsw, day(2025, 11, 12), &Utc).is_none());
    }
}
