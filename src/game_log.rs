use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::StatsConfig;
use crate::error::{FetchError, UpstreamError};
use crate::http_client::{JsonRequest, fetch_text, non_empty_body};
use crate::matchup::parse_matchup;
use crate::model::{GameRecord, GameSeries, MAX_GAMES, PlayerIdentity, UNKNOWN_TEAM, person_key};

pub const ADAPTER: &str = "nba_stats";

const STATS_HEADERS: [(&str, &str); 5] = [
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Referer", "https://www.nba.com/"),
    ("Origin", "https://www.nba.com"),
    ("x-nba-stats-origin", "stats"),
    ("x-nba-stats-token", "true"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerGameLog {
    pub player: PlayerIdentity,
    pub games: GameSeries,
}

pub trait GameLogSource: Send + Sync {
    /// `player_ref` is a provider person id or a player name.
    fn fetch_game_log(&self, player_ref: &str) -> Result<PlayerGameLog, FetchError>;
}

pub struct NbaStatsClient {
    cfg: StatsConfig,
    season: Option<String>,
}

impl NbaStatsClient {
    pub fn new(cfg: StatsConfig) -> Self {
        Self { cfg, season: None }
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    fn season(&self) -> String {
        self.season
            .clone()
            .unwrap_or_else(|| season_label(Local::now().date_naive()))
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String, UpstreamError> {
        let url = format!("{}/{endpoint}", self.cfg.base_url);
        fetch_text(&JsonRequest {
            adapter: ADAPTER,
            url: &url,
            query,
            headers: &STATS_HEADERS,
            timeout: self.cfg.timeout,
        })
    }

    pub fn player_index(&self, season: &str) -> Result<Vec<IndexedPlayer>, UpstreamError> {
        let body = self.get(
            "commonallplayers",
            &[
                ("LeagueID", "00"),
                ("Season", season),
                ("IsOnlyCurrentSeason", "1"),
            ],
        )?;
        parse_player_index(&body)
    }

    pub fn player_info(&self, person_id: u64) -> Result<Option<PlayerIdentity>, UpstreamError> {
        let id = person_id.to_string();
        let body = self.get("commonplayerinfo", &[("PlayerID", id.as_str())])?;
        parse_player_info(&body)
    }

    pub fn game_log(&self, person_id: u64, season: &str) -> Result<GameLogRows, UpstreamError> {
        let id = person_id.to_string();
        let body = self.get(
            "playergamelog",
            &[
                ("LeagueID", "00"),
                ("PlayerID", id.as_str()),
                ("Season", season),
                ("SeasonType", "Regular Season"),
            ],
        )?;
        parse_game_log(&body)
    }

    fn resolve_by_name(&self, name: &str, season: &str) -> Result<PlayerIdentity, FetchError> {
        let index = self.player_index(season)?;
        let Some(hit) = match_player(&index, name) else {
            return Err(FetchError::NotFound(name.to_string()));
        };
        debug!(adapter = ADAPTER, id = hit.id, name = %hit.name, "player index match");

        let mut player = PlayerIdentity::from_display_name(&hit.name, &hit.team);
        player.provider_id = Some(hit.id);

        match self.player_info(hit.id) {
            Ok(Some(info)) => {
                if !info.first_name.is_empty() {
                    player.first_name = info.first_name;
                    player.last_name = info.last_name;
                }
                player.position = info.position;
                if !player.has_team() && info.team_abbreviation != UNKNOWN_TEAM {
                    player.team_abbreviation = info.team_abbreviation;
                }
            }
            Ok(None) => {}
            Err(err) => warn!(adapter = ADAPTER, error = %err, "player info unavailable"),
        }
        Ok(player)
    }
}

impl GameLogSource for NbaStatsClient {
    fn fetch_game_log(&self, player_ref: &str) -> Result<PlayerGameLog, FetchError> {
        let player_ref = player_ref.trim();
        if player_ref.is_empty() {
            return Err(FetchError::NotFound("empty player reference".to_string()));
        }
        let season = self.season();

        let mut player = match player_ref.parse::<u64>() {
            Ok(id) => self
                .player_info(id)?
                .ok_or_else(|| FetchError::NotFound(player_ref.to_string()))?,
            Err(_) => self.resolve_by_name(player_ref, &season)?,
        };
        let Some(person_id) = player.provider_id else {
            return Err(FetchError::NotFound(player_ref.to_string()));
        };

        let rows = self.game_log(person_id, &season)?;
        if !player.has_team() {
            if let Some(team) = rows.latest_team.clone() {
                player.team_abbreviation = team;
            }
        }
        let games = GameSeries::from_most_recent_first(rows.games);
        info!(
            adapter = ADAPTER,
            player = %player.display_name,
            season = %season,
            games = games.len(),
            "game log loaded"
        );
        Ok(PlayerGameLog { player, games })
    }
}

/// NBA seasons start in October: Oct-Dec belong to `YYYY-(YY+1)`.
pub fn season_label(today: NaiveDate) -> String {
    let year = today.year();
    let start = if today.month() >= 10 { year } else { year - 1 };
    format!("{start}-{:02}", (start + 1) % 100)
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets", default)]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(rename = "rowSet", default)]
    pub row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }
}

/// Picks the named result set, or the first one when the name is absent.
pub fn parse_result_set(body: &str, name: &str) -> Result<ResultSet, UpstreamError> {
    let trimmed = non_empty_body(ADAPTER, body)?;
    let parsed: StatsResponse = serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::parse(ADAPTER, format!("invalid stats json: {e}")))?;
    let mut sets = parsed.result_sets.into_iter();
    let first = sets
        .next()
        .ok_or_else(|| UpstreamError::parse(ADAPTER, "response has no result sets"))?;
    if first.name.eq_ignore_ascii_case(name) {
        return Ok(first);
    }
    Ok(sets
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .unwrap_or(first))
}

fn cell<'a>(row: &'a [Value], idx: Option<usize>) -> Option<&'a Value> {
    idx.and_then(|i| row.get(i)).filter(|v| !v.is_null())
}

fn cell_str(row: &[Value], idx: Option<usize>) -> Option<String> {
    match cell(row, idx)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn cell_u64(row: &[Value], idx: Option<usize>) -> Option<u64> {
    match cell(row, idx)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPlayer {
    pub id: u64,
    pub name: String,
    pub team: String,
}

pub fn parse_player_index(body: &str) -> Result<Vec<IndexedPlayer>, UpstreamError> {
    let set = parse_result_set(body, "CommonAllPlayers")?;
    let id_col = set.column("PERSON_ID");
    let name_col = set
        .column("DISPLAY_FIRST_LAST")
        .or_else(|| set.column("PLAYER_NAME"));
    if id_col.is_none() || name_col.is_none() {
        return Err(UpstreamError::parse(ADAPTER, "player index missing id/name columns"));
    }
    let team_col = set.column("TEAM_ABBREVIATION");

    Ok(set
        .row_set
        .iter()
        .filter_map(|row| {
            Some(IndexedPlayer {
                id: cell_u64(row, id_col)?,
                name: cell_str(row, name_col)?,
                team: cell_str(row, team_col).unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
            })
        })
        .collect())
}

/// Exact name match beats prefix beats substring; rostered players win ties,
/// then alphabetical order.
pub fn match_player<'a>(index: &'a [IndexedPlayer], query: &str) -> Option<&'a IndexedPlayer> {
    let wanted = person_key(query);
    if wanted.is_empty() {
        return None;
    }
    index
        .iter()
        .filter_map(|p| {
            let key = person_key(&p.name);
            let rank = if key == wanted {
                0
            } else if key.starts_with(&wanted) {
                1
            } else if key.contains(&wanted) {
                2
            } else {
                return None;
            };
            let unrostered = p.team == UNKNOWN_TEAM;
            Some(((rank, unrostered, key), p))
        })
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, p)| p)
}

pub fn parse_player_info(body: &str) -> Result<Option<PlayerIdentity>, UpstreamError> {
    let set = parse_result_set(body, "CommonPlayerInfo")?;
    let Some(row) = set.row_set.first() else {
        return Ok(None);
    };
    let Some(id) = cell_u64(row, set.column("PERSON_ID")) else {
        return Ok(None);
    };
    let first = cell_str(row, set.column("FIRST_NAME")).unwrap_or_default();
    let last = cell_str(row, set.column("LAST_NAME")).unwrap_or_default();
    let display = cell_str(row, set.column("DISPLAY_FIRST_LAST"))
        .unwrap_or_else(|| format!("{first} {last}").trim().to_string());
    if display.is_empty() {
        return Ok(None);
    }
    let team = cell_str(row, set.column("TEAM_ABBREVIATION")).unwrap_or_default();

    let mut player = PlayerIdentity::from_display_name(&display, &team);
    if !first.is_empty() {
        player.first_name = first;
        player.last_name = last;
    }
    player.provider_id = Some(id);
    player.position = cell_str(row, set.column("POSITION"));
    Ok(Some(player))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameLogRows {
    pub games: Vec<GameRecord>,
    /// The player's own side in the latest matchup.
    pub latest_team: Option<String>,
}

pub fn parse_game_log(body: &str) -> Result<GameLogRows, UpstreamError> {
    let set = parse_result_set(body, "PlayerGameLog")?;
    let pts_col = set
        .column("PTS")
        .ok_or_else(|| UpstreamError::parse(ADAPTER, "game log missing PTS column"))?;
    let date_col = set.column("GAME_DATE");
    let matchup_col = set.column("MATCHUP");
    let min_col = set.column("MIN");
    let wl_col = set.column("WL");

    let mut latest_team = None;
    let mut games = Vec::new();
    // Rows without a points total (postponed or DNP entries) are not games.
    for row in &set.row_set {
        if games.len() == MAX_GAMES {
            break;
        }
        let Some(points) = cell_u64(row, Some(pts_col)) else {
            continue;
        };
        let matchup = parse_matchup(&cell_str(row, matchup_col).unwrap_or_default());
        if games.is_empty() {
            latest_team = matchup.team.clone();
        }
        games.push(GameRecord {
            sequence_number: games.len() as u32 + 1,
            date: cell_str(row, date_col).as_deref().and_then(parse_game_date),
            points: points as u32,
            minutes: parse_minutes(cell(row, min_col)),
            opponent_abbreviation: matchup.opponent,
            is_home: matchup.is_home,
            result: cell_str(row, wl_col),
        });
    }

    Ok(GameLogRows { games, latest_team })
}

/// Oldest first, uncapped.
pub fn parse_points_history(body: &str) -> Result<Vec<f64>, UpstreamError> {
    let set = parse_result_set(body, "PlayerGameLog")?;
    let pts_col = set
        .column("PTS")
        .ok_or_else(|| UpstreamError::parse(ADAPTER, "game log missing PTS column"))?;
    Ok(set
        .row_set
        .iter()
        .rev()
        .filter_map(|row| cell_u64(row, Some(pts_col)))
        .map(|pts| pts as f64)
        .collect())
}

pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%m/%d/%Y", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Accepts plain numbers and "MM:SS" clock strings.
pub fn parse_minutes(value: Option<&Value>) -> f32 {
    let minutes = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.split_once(':') {
                Some((m, sec)) => match (m.parse::<f64>(), sec.parse::<f64>()) {
                    (Ok(m), Ok(sec)) => Some(m + sec / 60.0),
                    _ => None,
                },
                None => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    };
    minutes
        .filter(|m| m.is_finite() && *m >= 0.0)
        .map(|m| ((m * 10.0).round() / 10.0) as f32)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn season_label_rolls_over_in_october() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(season_label(d(2026, 10, 19)), "2026-27");
        assert_eq!(season_label(d(2026, 9, 30)), "2025-26");
        assert_eq!(season_label(d(2000, 3, 1)), "1999-00");
        assert_eq!(season_label(d(2099, 12, 31)), "2099-00");
    }

    #[test]
    fn dates_in_provider_formats() {
        let want = NaiveDate::from_ymd_opt(2025, 11, 12);
        assert_eq!(parse_game_date("2025-11-12"), want);
        assert_eq!(parse_game_date("NOV 12, 2025"), want);
        assert_eq!(parse_game_date("Nov 12, 2025"), want);
        assert_eq!(parse_game_date("20251112"), want);
        assert_eq!(parse_game_date("2025-11-12T00:00:00"), want);
        assert_eq!(parse_game_date("soon"), None);
    }

    #[test]
    fn minutes_from_numbers_and_clock_strings() {
        assert_eq!(parse_minutes(Some(&json!(34))), 34.0);
        assert_eq!(parse_minutes(Some(&json!("36:30"))), 36.5);
        assert_eq!(parse_minutes(Some(&json!("28"))), 28.0);
        assert_eq!(parse_minutes(Some(&json!("DNP"))), 0.0);
        assert_eq!(parse_minutes(None), 0.0);
    }

    fn index() -> Vec<IndexedPlayer> {
        let p = |id, name: &str, team: &str| IndexedPlayer {
            id,
            name: name.to_string(),
            team: team.to_string(),
        };
        vec![
            p(1, "Anthony Davis", "DAL"),
            p(2, "Anthony Edwards", "MIN"),
            p(3, "Davis Bertans", UNKNOWN_TEAM),
            p(4, "Stephen Curry", "GSW"),
            p(5, "Seth Curry", "CHA"),
        ]
    }

    #[test]
    fn exact_name_beats_partial_matches() {
        let index = index();
        assert_eq!(match_player(&index, "stephen curry").map(|p| p.id), Some(4));
        assert_eq!(match_player(&index, "Anthony").map(|p| p.id), Some(1));
        assert_eq!(match_player(&index, "curry").map(|p| p.id), Some(5));
        assert_eq!(match_player(&index, "davis").map(|p| p.id), Some(3));
        assert!(match_player(&index, "wembanyama").is_none());
        assert!(match_player(&index, "  ").is_none());
    }

    #[test]
    fn missing_points_column_is_a_parse_error() {
        let body = r#"{"resultSets":[{"name":"PlayerGameLog","headers":["GAME_DATE","MATCHUP"],"rowSet":[]}]}"#;
        let err = parse_game_log(body).unwrap_err();
        assert!(matches!(err, UpstreamError::Parse { .. }));
    }

    #[test]
    fn rows_without_points_are_skipped() {
        let body = json!({"resultSets": [{
            "name": "PlayerGameLog",
            "headers": ["GAME_DATE", "MATCHUP", "PTS"],
            "rowSet": [
                ["NOV 14, 2025", "GSW vs. BOS", null],
                ["NOV 12, 2025", "GSW vs. LAL", 30],
                ["NOV 10, 2025", "GSW @ POR", "DNP"],
                ["NOV 08, 2025", "GSW @ DEN", 28]
            ]
        }]})
        .to_string();

        let rows = parse_game_log(&body).unwrap();
        let points: Vec<u32> = rows.games.iter().map(|g| g.points).collect();
        assert_eq!(points, vec![30, 28]);
        let numbers: Vec<u32> = rows.games.iter().map(|g| g.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(rows.games[0].opponent_abbreviation, "LAL");
        assert_eq!(rows.latest_team.as_deref(), Some("GSW"));

        assert_eq!(parse_points_history(&body).unwrap(), vec![28.0, 30.0]);
    }

    #[test]
    fn empty_info_rows_mean_no_player() {
        let body = r#"{"resultSets":[{"name":"CommonPlayerInfo","headers":["PERSON_ID"],"rowSet":[]}]}"#;
        assert_eq!(parse_player_info(body).unwrap(), None);
    }
}
