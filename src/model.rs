use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_GAMES_FOR_PREDICTION: usize = 3;
pub const MAX_GAMES: usize = 10;
pub const UNKNOWN_TEAM: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub team_abbreviation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl PlayerIdentity {
    /// Splits a "First Last..." display name; everything after the first word is the last name.
    pub fn from_display_name(display_name: &str, team_abbreviation: &str) -> Self {
        let display_name = display_name.trim();
        let (first, last) = match display_name.split_once(' ') {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (display_name.to_string(), String::new()),
        };
        Self {
            display_name: display_name.to_string(),
            first_name: first,
            last_name: last,
            team_abbreviation: normalize_team_field(team_abbreviation),
            provider_id: None,
            position: None,
        }
    }

    pub fn has_team(&self) -> bool {
        let t = self.team_abbreviation.trim();
        !t.is_empty() && t != UNKNOWN_TEAM
    }
}

fn normalize_team_field(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() {
        UNKNOWN_TEAM.to_string()
    } else {
        t.to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 1 = most recent game.
    pub sequence_number: u32,
    pub date: Option<NaiveDate>,
    pub points: u32,
    pub minutes: f32,
    pub opponent_abbreviation: String,
    pub is_home: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Games for one player, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameSeries {
    games: Vec<GameRecord>,
}

impl GameSeries {
    /// Takes records already ordered most-recent-first, keeps at most
    /// [`MAX_GAMES`] and renumbers them 1..=N.
    pub fn from_most_recent_first(mut games: Vec<GameRecord>) -> Self {
        games.truncate(MAX_GAMES);
        for (idx, game) in games.iter_mut().enumerate() {
            game.sequence_number = idx as u32 + 1;
        }
        Self { games }
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Points ordered oldest to newest, the orientation the regression fits on.
    pub fn chronological_points(&self) -> Vec<f64> {
        self.games.iter().rev().map(|g| g.points as f64).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_points: f64,
    pub confidence: f64,
    pub error_margin: f64,
    pub games_used: usize,
    pub fit: RegressionFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSource {
    #[serde(rename = "theoddsapi")]
    TheOddsApi,
    /// Filler value, not quoted by any bookmaker.
    #[serde(rename = "default")]
    Default,
}

impl LineSource {
    pub fn label(self) -> &'static str {
        match self {
            LineSource::TheOddsApi => "theoddsapi",
            LineSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketLine {
    pub line: Option<f64>,
    pub over_price: Option<i32>,
    pub under_price: Option<i32>,
    pub source: LineSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmaker: Option<String>,
}

impl MarketLine {
    pub fn usable_line(&self) -> Option<f64> {
        self.line.filter(|l| l.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextFixture {
    pub opponent_abbreviation: String,
    pub date: NaiveDate,
    /// Local tip-off time, "TBD" when the provider carries no time.
    pub time: String,
    pub is_home: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamBadge {
    pub abbreviation: String,
    pub name: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "OVER")]
    Over,
    #[serde(rename = "UNDER")]
    Under,
    #[serde(rename = "PUSH")]
    Push,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Recommendation {
    pub fn from_values(predicted: Option<f64>, line: Option<f64>) -> Self {
        match (predicted, line) {
            (Some(p), Some(l)) if p.is_finite() && l.is_finite() => {
                if p > l {
                    Recommendation::Over
                } else if p < l {
                    Recommendation::Under
                } else {
                    Recommendation::Push
                }
            }
            _ => Recommendation::NotAvailable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Over => "OVER",
            Recommendation::Under => "UNDER",
            Recommendation::Push => "PUSH",
            Recommendation::NotAvailable => "N/A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub player: PlayerIdentity,
    pub games: GameSeries,
    pub prediction: Prediction,
    pub market_line: MarketLine,
    pub recommendation: Recommendation,
    pub edge: Option<f64>,
    pub team: TeamBadge,
    pub next_fixture: Option<NextFixture>,
    pub opponent: Option<TeamBadge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Comparison key for player names across providers: lowercase words with
/// punctuation and generational suffixes dropped ("P.J. Washington Jr." -> "pj washington").
pub fn person_key(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter_map(|c| {
            let c = fold_diacritic(c.to_lowercase().next().unwrap_or(c));
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() || c == '-' {
                Some(' ')
            } else {
                None
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !matches!(*w, "jr" | "sr" | "ii" | "iii" | "iv"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' => 'a',
        'ć' | 'č' | 'ç' => 'c',
        'đ' | 'ď' => 'd',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => 'e',
        'ģ' | 'ğ' => 'g',
        'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
        'ķ' => 'k',
        'ļ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' => 'o',
        'ř' => 'r',
        'š' | 'ś' | 'ş' => 's',
        'ť' => 't',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'ý' => 'y',
        'ž' | 'ź' | 'ż' => 'z',
        other => other,
    }
}
