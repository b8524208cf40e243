//! Matchup notation used by box-score providers.
//!
//! Grammar: `TEAM WS ("vs." | "vs" | "@") WS TEAM [trailing text]`, where `TEAM` is
//! 2-4 ASCII letters. The first team is the player's own side, the second is the
//! opponent; `vs.` marks a home game and `@` an away game. Anything that does not
//! fit yields an opponent of `"N/A"`.

use crate::model::UNKNOWN_TEAM;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub team: Option<String>,
    pub opponent: String,
    pub is_home: bool,
}

impl Matchup {
    fn unparsed() -> Self {
        Self {
            team: None,
            opponent: UNKNOWN_TEAM.to_string(),
            is_home: false,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.opponent != UNKNOWN_TEAM
    }
}

pub fn parse_matchup(raw: &str) -> Matchup {
    let mut tokens = raw.split_whitespace();
    let (Some(first), Some(sep), Some(second)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Matchup::unparsed();
    };

    let is_home = match sep.to_ascii_lowercase().as_str() {
        "vs." | "vs" => true,
        "@" => false,
        _ => return Matchup::unparsed(),
    };

    let (Some(team), Some(opponent)) = (team_token(first), team_token(second)) else {
        return Matchup::unparsed();
    };

    Matchup {
        team: Some(team),
        opponent,
        is_home,
    }
}

fn team_token(raw: &str) -> Option<String> {
    let t = raw.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if (2..=4).contains(&t.len()) && t.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(t.to_ascii_uppercase())
    } else {
        None
    }
}
