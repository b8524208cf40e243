use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EspnConfig;
use crate::error::UpstreamError;
use crate::http_client::{JsonRequest, fetch_text, non_empty_body};
use crate::model::person_key;
use crate::teams::{TEAMS, Team};

pub const ADAPTER: &str = "espn_roster";
const MAX_RESULTS: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    #[serde(default)]
    pub short_name: String,
    pub position: Option<String>,
    pub team_abbreviation: String,
    pub team_name: String,
    pub jersey: Option<String>,
    pub headshot: Option<String>,
}

impl RosterPlayer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    fn matches(&self, wanted: &str) -> bool {
        [self.full_name(), self.display_name.clone(), self.short_name.clone()]
            .iter()
            .any(|name| person_key(name).contains(wanted))
    }
}

/// A roster that fails to load is skipped; the call only errors when no
/// roster could be read at all.
pub fn search_players(cfg: &EspnConfig, query: &str) -> Result<Vec<RosterPlayer>, UpstreamError> {
    let wanted = person_key(query);
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let results: Vec<Result<Vec<RosterPlayer>, UpstreamError>> = with_fetch_pool(cfg, || {
        TEAMS
            .par_iter()
            .map(|team| fetch_roster(cfg, team))
            .collect()
    });

    let mut failures = 0usize;
    let mut last_error = None;
    let mut found = Vec::new();
    for result in results {
        match result {
            Ok(players) => found.extend(players.into_iter().filter(|p| p.matches(&wanted))),
            Err(err) => {
                debug!(adapter = ADAPTER, error = %err, "roster skipped");
                failures += 1;
                last_error = Some(err);
            }
        }
    }
    if failures == TEAMS.len()
        && let Some(err) = last_error
    {
        return Err(err);
    }
    if failures > 0 {
        warn!(adapter = ADAPTER, failures, "some rosters could not be read");
    }

    let ranked = rank_matches(found, &wanted);
    info!(adapter = ADAPTER, query, matches = ranked.len(), "roster search");
    Ok(ranked)
}

pub fn rank_matches(players: Vec<RosterPlayer>, wanted: &str) -> Vec<RosterPlayer> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RosterPlayer> = players
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect();
    unique.sort_by_cached_key(|p| {
        let key = person_key(&p.full_name());
        (!key.starts_with(wanted), key)
    });
    unique.truncate(MAX_RESULTS);
    unique
}

pub fn team_for_player(cfg: &EspnConfig, display_name: &str) -> Result<Option<String>, UpstreamError> {
    let matches = search_players(cfg, display_name)?;
    let wanted = person_key(display_name);
    let hit = matches
        .iter()
        .find(|p| person_key(&p.full_name()) == wanted || person_key(&p.display_name) == wanted)
        .or_else(|| matches.first());
    Ok(hit.map(|p| p.team_abbreviation.clone()))
}

fn fetch_roster(cfg: &EspnConfig, team: &Team) -> Result<Vec<RosterPlayer>, UpstreamError> {
    let url = format!("{}/teams/{}/roster", cfg.base_url, team.espn_id);
    let body = fetch_text(&JsonRequest {
        adapter: ADAPTER,
        url: &url,
        query: &[("region", "us"), ("lang", "en"), ("contentorigin", "espn")],
        headers: &[],
        timeout: cfg.timeout,
    })?;
    parse_roster(&body, team)
}

pub fn parse_roster(body: &str, team: &Team) -> Result<Vec<RosterPlayer>, UpstreamError> {
    let trimmed = non_empty_body(ADAPTER, body)?;
    let v: Value = serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::parse(ADAPTER, format!("invalid roster json: {e}")))?;
    let Some(athletes) = v.get("athletes").and_then(|a| a.as_array()) else {
        return Ok(Vec::new());
    };

    // Some seasons group athletes by position: [{ "position": "guards", "items": [...] }].
    let mut out = Vec::new();
    for entry in athletes {
        match entry.get("items").and_then(|i| i.as_array()) {
            Some(items) => out.extend(items.iter().filter_map(|a| parse_athlete(a, team))),
            None => out.extend(parse_athlete(entry, team)),
        }
    }
    Ok(out)
}

fn parse_athlete(v: &Value, team: &Team) -> Option<RosterPlayer> {
    let id = match v.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let text = |key: &str| {
        v.get(key)
            .and_then(|x| x.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let first_name = text("firstName");
    let last_name = text("lastName");
    let mut display_name = text("displayName");
    if display_name.is_empty() {
        display_name = format!("{first_name} {last_name}").trim().to_string();
    }
    if display_name.is_empty() {
        return None;
    }
    let position = v.get("position").and_then(|p| {
        p.get("abbreviation")
            .or_else(|| p.get("name"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
    });

    Some(RosterPlayer {
        id,
        first_name,
        last_name,
        display_name,
        short_name: text("shortName"),
        position,
        team_abbreviation: team.abbr.to_string(),
        team_name: team.name.to_string(),
        jersey: Some(text("jersey")).filter(|s| !s.is_empty()),
        headshot: v
            .get("headshot")
            .and_then(|h| h.get("href"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
    })
}

fn with_fetch_pool<T>(cfg: &EspnConfig, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.fetch_parallelism)
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teams::find_team;

    fn player(id: &str, first: &str, last: &str) -> RosterPlayer {
        RosterPlayer {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            display_name: format!("{first} {last}"),
            short_name: String::new(),
            position: None,
            team_abbreviation: "GSW".to_string(),
            team_name: "Golden State Warriors".to_string(),
            jersey: None,
            headshot: None,
        }
    }

    #[test]
    fn ranking_prefers_prefix_matches_and_dedups() {
        let players = vec![
            player("3", "Seth", "Curry"),
            player("1", "Stephen", "Curry"),
            player("2", "Curry", "Brown"),
            player("1", "Stephen", "Curry"),
        ];
        let ranked = rank_matches(players, "curry");
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn grouped_and_flat_rosters_both_parse() {
        let team = find_team("GSW").unwrap();
        let flat = r#"{"athletes":[{"id":"3975","firstName":"Stephen","lastName":"Curry","displayName":"Stephen Curry","position":{"abbreviation":"PG"},"jersey":"30"}]}"#;
        let grouped = r#"{"athletes":[{"position":"guards","items":[{"id":3975,"firstName":"Stephen","lastName":"Curry"}]}]}"#;

        let a = parse_roster(flat, team).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].position.as_deref(), Some("PG"));
        assert_eq!(a[0].jersey.as_deref(), Some("30"));
        assert_eq!(a[0].team_abbreviation, "GSW");

        let b = parse_roster(grouped, team).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].id, "3975");
        assert_eq!(b[0].display_name, "Stephen Curry");
    }

    #[test]
    fn matching_uses_all_name_forms() {
        let mut p = player("9", "Nicolas", "Claxton");
        p.short_name = "N. Claxton".to_string();
        p.display_name = "Nic Claxton".to_string();
        assert!(p.matches(&person_key("nic claxton")));
        assert!(p.matches(&person_key("nicolas")));
        assert!(!p.matches(&person_key("curry")));
    }
}
