use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OddsConfig;
use crate::error::UpstreamError;
use crate::http_client::{JsonRequest, fetch_text, non_empty_body};
use crate::model::{LineSource, MarketLine, PlayerIdentity, person_key};
use crate::teams::{canonical_abbreviation, find_team_by_name};

pub const ADAPTER: &str = "the_odds_api";

const SPORT_KEY: &str = "basketball_nba";
const POINTS_MARKET: &str = "player_points";
const FILLER_PRICE: i32 = -110;

/// Outcome of a line lookup that reached the provider. "No line" is a normal
/// answer, kept apart from transport failures which surface as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketLookup {
    Line(MarketLine),
    NoLine(String),
}

pub trait MarketLineSource: Send + Sync {
    fn fetch_market_line(&self, player: &PlayerIdentity) -> Result<MarketLookup, UpstreamError>;
}

pub struct TheOddsApiClient {
    cfg: OddsConfig,
}

impl TheOddsApiClient {
    pub fn new(cfg: OddsConfig) -> Self {
        Self { cfg }
    }

    fn no_line(&self, reason: String) -> MarketLookup {
        match self.cfg.fallback_line {
            Some(line) => {
                info!(adapter = ADAPTER, line, reason = %reason, "using filler line");
                MarketLookup::Line(MarketLine {
                    line: Some(line),
                    over_price: Some(FILLER_PRICE),
                    under_price: Some(FILLER_PRICE),
                    source: LineSource::Default,
                    bookmaker: None,
                })
            }
            None => MarketLookup::NoLine(reason),
        }
    }

    fn events(&self, api_key: &str) -> Result<Vec<OddsEvent>, UpstreamError> {
        let url = format!("{}/sports/{SPORT_KEY}/events", self.cfg.base_url);
        let body = fetch_text(&JsonRequest {
            adapter: ADAPTER,
            url: &url,
            query: &[("apiKey", api_key), ("dateFormat", "iso")],
            headers: &[],
            timeout: self.cfg.timeout,
        })?;
        parse_events(&body)
    }

    fn event_odds(&self, api_key: &str, event_id: &str) -> Result<String, UpstreamError> {
        let url = format!(
            "{}/sports/{SPORT_KEY}/events/{event_id}/odds",
            self.cfg.base_url
        );
        let mut query = vec![
            ("apiKey", api_key),
            ("regions", self.cfg.regions.as_str()),
            ("markets", POINTS_MARKET),
            ("oddsFormat", "american"),
            ("dateFormat", "iso"),
        ];
        if let Some(books) = self.cfg.bookmakers.as_deref() {
            query.push(("bookmakers", books));
        }
        fetch_text(&JsonRequest {
            adapter: ADAPTER,
            url: &url,
            query: &query,
            headers: &[],
            timeout: self.cfg.timeout,
        })
    }
}

impl MarketLineSource for TheOddsApiClient {
    fn fetch_market_line(&self, player: &PlayerIdentity) -> Result<MarketLookup, UpstreamError> {
        let Some(api_key) = self.cfg.api_key.as_deref() else {
            return Ok(self.no_line("ODDS_API_KEY missing".to_string()));
        };

        let events = self.events(api_key)?;
        let team = canonical_abbreviation(&player.team_abbreviation);
        let candidates = candidate_events(&events, team, self.cfg.max_events);
        debug!(
            adapter = ADAPTER,
            events = events.len(),
            candidates = candidates.len(),
            team = team.unwrap_or("-"),
            "odds events listed"
        );

        for event in candidates {
            let body = match self.event_odds(api_key, &event.id) {
                Ok(body) => body,
                // Events drop off the board once they tip; the id then 404s.
                Err(UpstreamError::Status { status: 404 | 422, .. }) => continue,
                Err(err) => return Err(err),
            };
            let quotes = parse_event_quotes(&body, &player.display_name)?;
            if let Some(line) = consensus(&quotes) {
                info!(
                    adapter = ADAPTER,
                    player = %player.display_name,
                    event = %event.id,
                    books = quotes.len(),
                    line = line.line.unwrap_or_default(),
                    "points line found"
                );
                return Ok(MarketLookup::Line(line));
            }
        }

        Ok(self.no_line(format!(
            "no {POINTS_MARKET} line listed for {}",
            player.display_name
        )))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    #[serde(default)]
    pub commence_time: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

impl OddsEvent {
    fn kickoff(&self) -> Option<DateTime<Utc>> {
        let raw = self.commence_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn involves(&self, team: &str) -> bool {
        [&self.home_team, &self.away_team]
            .iter()
            .any(|name| find_team_by_name(name).is_some_and(|t| t.abbr == team))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Clone, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
struct OddsOutcome {
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: Option<f64>,
    point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookQuote {
    pub bookmaker: String,
    pub line: f64,
    pub over_price: Option<i32>,
    pub under_price: Option<i32>,
}

pub fn parse_events(body: &str) -> Result<Vec<OddsEvent>, UpstreamError> {
    let trimmed = non_empty_body(ADAPTER, body)?;
    serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::parse(ADAPTER, format!("invalid events json: {e}")))
}

pub fn candidate_events<'a>(
    events: &'a [OddsEvent],
    team: Option<&str>,
    limit: usize,
) -> Vec<&'a OddsEvent> {
    let mut picked: Vec<&OddsEvent> = events
        .iter()
        .filter(|e| team.is_none_or(|t| e.involves(t)))
        .collect();
    // Unparseable kickoffs sort last.
    picked.sort_by_key(|e| (e.kickoff().is_none(), e.kickoff()));
    picked.truncate(limit);
    picked
}

pub fn parse_event_quotes(body: &str, player_name: &str) -> Result<Vec<BookQuote>, UpstreamError> {
    let trimmed = non_empty_body(ADAPTER, body)?;
    let event: OddsEvent = serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::parse(ADAPTER, format!("invalid event odds json: {e}")))?;
    let wanted = person_key(player_name);

    let mut quotes = Vec::new();
    for book in &event.bookmakers {
        let Some(market) = book.markets.iter().find(|m| m.key == POINTS_MARKET) else {
            continue;
        };
        let side = |label: &str| {
            market.outcomes.iter().find(|o| {
                o.name.eq_ignore_ascii_case(label)
                    && o.description.as_deref().is_some_and(|d| person_key(d) == wanted)
            })
        };
        let over = side("Over");
        let under = side("Under");
        let Some(line) = over
            .and_then(|o| o.point)
            .or_else(|| under.and_then(|u| u.point))
            .filter(|l| l.is_finite())
        else {
            continue;
        };
        let bookmaker = if book.title.is_empty() {
            book.key.clone()
        } else {
            book.title.clone()
        };
        quotes.push(BookQuote {
            bookmaker,
            line,
            over_price: over.and_then(|o| american_price(o.price)),
            under_price: under.and_then(|u| american_price(u.price)),
        });
    }
    Ok(quotes)
}

fn american_price(price: Option<f64>) -> Option<i32> {
    price.filter(|p| p.is_finite()).map(|p| p.round() as i32)
}

/// Median line across bookmakers, priced by the quote nearest that median.
pub fn consensus(quotes: &[BookQuote]) -> Option<MarketLine> {
    let mut lines: Vec<f64> = quotes.iter().map(|q| q.line).collect();
    if lines.is_empty() {
        return None;
    }
    lines.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = lines.len() / 2;
    let median = if lines.len() % 2 == 0 {
        (lines[mid - 1] + lines[mid]) / 2.0
    } else {
        lines[mid]
    };

    let mut nearest = &quotes[0];
    for quote in &quotes[1..] {
        if (quote.line - median).abs() < (nearest.line - median).abs() {
            nearest = quote;
        }
    }
    Some(MarketLine {
        line: Some(median),
        over_price: nearest.over_price,
        under_price: nearest.under_price,
        source: LineSource::TheOddsApi,
        bookmaker: Some(nearest.bookmaker.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn quote(book: &str, line: f64, over: i32) -> BookQuote {
        BookQuote {
            bookmaker: book.to_string(),
            line,
            over_price: Some(over),
            under_price: Some(-110),
        }
    }

    const EVENT_ODDS: &str = r#"{
        "id": "e1", "home_team": "Golden State Warriors", "away_team": "Los Angeles Lakers",
        "bookmakers": [
            {"key": "draftkings", "title": "DraftKings", "markets": [
                {"key": "player_points", "outcomes": [
                    {"name": "Over", "description": "Stephen Curry", "price": -115, "point": 26.5},
                    {"name": "Under", "description": "Stephen Curry", "price": -105, "point": 26.5},
                    {"name": "Over", "description": "LeBron James", "price": -110, "point": 24.5}
                ]}
            ]},
            {"key": "fanduel", "title": "FanDuel", "markets": [
                {"key": "player_rebounds", "outcomes": [
                    {"name": "Over", "description": "Stephen Curry", "price": -110, "point": 4.5}
                ]}
            ]}
        ]
    }"#;

    #[test]
    fn quotes_are_read_per_bookmaker_for_the_named_player() {
        let quotes = parse_event_quotes(EVENT_ODDS, "stephen curry").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].bookmaker, "DraftKings");
        assert_eq!(quotes[0].line, 26.5);
        assert_eq!(quotes[0].over_price, Some(-115));
        assert_eq!(quotes[0].under_price, Some(-105));

        assert!(parse_event_quotes(EVENT_ODDS, "Nikola Jokic").unwrap().is_empty());
    }

    #[test]
    fn consensus_takes_median_and_nearest_prices() {
        let odd = consensus(&[
            quote("a", 25.5, -120),
            quote("b", 26.5, -110),
            quote("c", 27.5, -105),
        ])
        .unwrap();
        assert_eq!(odd.line, Some(26.5));
        assert_eq!(odd.bookmaker.as_deref(), Some("b"));
        assert_eq!(odd.source, LineSource::TheOddsApi);

        let even = consensus(&[quote("a", 25.5, -120), quote("b", 26.5, -110)]).unwrap();
        assert_eq!(even.line, Some(26.0));
        // Both are 0.5 away; the first listed wins.
        assert_eq!(even.bookmaker.as_deref(), Some("a"));
        assert_eq!(even.over_price, Some(-120));

        assert!(consensus(&[]).is_none());
    }

    #[test]
    fn candidate_events_filter_by_team_and_sort_by_tipoff() {
        let body = r#"[
            {"id": "late", "commence_time": "2025-11-15T03:00:00Z", "home_team": "Golden State Warriors", "away_team": "Utah Jazz"},
            {"id": "other", "commence_time": "2025-11-13T00:00:00Z", "home_team": "Boston Celtics", "away_team": "Miami Heat"},
            {"id": "soon", "commence_time": "2025-11-13T03:00:00Z", "home_team": "LA Clippers", "away_team": "Golden State Warriors"}
        ]"#;
        let events = parse_events(body).unwrap();

        let ids: Vec<&str> = candidate_events(&events, Some("GSW"), 4)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["soon", "late"]);

        let all = candidate_events(&events, None, 2);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "other");
    }

    #[test]
    fn missing_key_is_no_line_or_filler() {
        let player = PlayerIdentity::from_display_name("Stephen Curry", "GSW");

        let cfg = EngineConfig::default().odds;
        let lookup = TheOddsApiClient::new(cfg.clone()).fetch_market_line(&player).unwrap();
        assert!(matches!(lookup, MarketLookup::NoLine(_)));

        let filler = OddsConfig {
            fallback_line: Some(25.5),
            ..cfg
        };
        let MarketLookup::Line(line) = TheOddsApiClient::new(filler).fetch_market_line(&player).unwrap()
        else {
            panic!("expected filler line");
        };
        assert_eq!(line.line, Some(25.5));
        assert_eq!(line.source, LineSource::Default);
        assert_eq!(line.over_price, Some(-110));
    }

    #[test]
    fn empty_event_body_is_a_parse_error() {
        let err = parse_event_quotes("null", "Stephen Curry").unwrap_err();
        assert_eq!(err.adapter(), ADAPTER);
    }
}
