use crate::model::TeamBadge;

const LOGO_BASE: &str = "https://a.espncdn.com/i/teamlogos/nba/500";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    /// Canonical NBA abbreviation.
    pub abbr: &'static str,
    pub espn_abbr: &'static str,
    pub espn_id: u16,
    pub nba_id: u32,
    pub name: &'static str,
    pub nickname: &'static str,
}

impl Team {
    pub fn logo_url(&self) -> String {
        format!("{LOGO_BASE}/{}.png", self.espn_abbr.to_ascii_lowercase())
    }

    pub fn badge(&self) -> TeamBadge {
        TeamBadge {
            abbreviation: self.abbr.to_string(),
            name: Some(self.name.to_string()),
            logo: Some(self.logo_url()),
        }
    }
}

const fn team(
    abbr: &'static str,
    espn_abbr: &'static str,
    espn_id: u16,
    nba_id: u32,
    name: &'static str,
    nickname: &'static str,
) -> Team {
    Team {
        abbr,
        espn_abbr,
        espn_id,
        nba_id,
        name,
        nickname,
    }
}

pub static TEAMS: [Team; 30] = [
    team("ATL", "ATL", 1, 1610612737, "Atlanta Hawks", "Hawks"),
    team("BOS", "BOS", 2, 1610612738, "Boston Celtics", "Celtics"),
    team("BKN", "BKN", 17, 1610612751, "Brooklyn Nets", "Nets"),
    team("CHA", "CHA", 30, 1610612766, "Charlotte Hornets", "Hornets"),
    team("CHI", "CHI", 4, 1610612741, "Chicago Bulls", "Bulls"),
    team("CLE", "CLE", 5, 1610612739, "Cleveland Cavaliers", "Cavaliers"),
    team("DAL", "DAL", 6, 1610612742, "Dallas Mavericks", "Mavericks"),
    team("DEN", "DEN", 7, 1610612743, "Denver Nuggets", "Nuggets"),
    team("DET", "DET", 8, 1610612765, "Detroit Pistons", "Pistons"),
    team("GSW", "GS", 9, 1610612744, "Golden State Warriors", "Warriors"),
    team("HOU", "HOU", 10, 1610612745, "Houston Rockets", "Rockets"),
    team("IND", "IND", 11, 1610612754, "Indiana Pacers", "Pacers"),
    team("LAC", "LAC", 12, 1610612746, "LA Clippers", "Clippers"),
    team("LAL", "LAL", 13, 1610612747, "Los Angeles Lakers", "Lakers"),
    team("MEM", "MEM", 29, 1610612763, "Memphis Grizzlies", "Grizzlies"),
    team("MIA", "MIA", 14, 1610612748, "Miami Heat", "Heat"),
    team("MIL", "MIL", 15, 1610612749, "Milwaukee Bucks", "Bucks"),
    team("MIN", "MIN", 16, 1610612750, "Minnesota Timberwolves", "Timberwolves"),
    team("NOP", "NO", 3, 1610612740, "New Orleans Pelicans", "Pelicans"),
    team("NYK", "NY", 18, 1610612752, "New York Knicks", "Knicks"),
    team("OKC", "OKC", 25, 1610612760, "Oklahoma City Thunder", "Thunder"),
    team("ORL", "ORL", 19, 1610612753, "Orlando Magic", "Magic"),
    team("PHI", "PHI", 20, 1610612755, "Philadelphia 76ers", "76ers"),
    team("PHX", "PHX", 21, 1610612756, "Phoenix Suns", "Suns"),
    team("POR", "POR", 22, 1610612757, "Portland Trail Blazers", "Trail Blazers"),
    team("SAC", "SAC", 23, 1610612758, "Sacramento Kings", "Kings"),
    team("SAS", "SA", 24, 1610612759, "San Antonio Spurs", "Spurs"),
    team("TOR", "TOR", 28, 1610612761, "Toronto Raptors", "Raptors"),
    team("UTA", "UTAH", 26, 1610612762, "Utah Jazz", "Jazz"),
    team("WAS", "WSH", 27, 1610612764, "Washington Wizards", "Wizards"),
];

// Spellings seen outside the two main providers (reference sites, books).
const EXTRA_ALIASES: [(&str, &str); 4] = [("BRK", "BKN"), ("PHO", "PHX"), ("CHO", "CHA"), ("NOR", "NOP")];

/// Looks a provider abbreviation up in either vocabulary.
pub fn find_team(raw: &str) -> Option<&'static Team> {
    let key = raw.trim().to_ascii_uppercase();
    if key.is_empty() {
        return None;
    }
    let key = EXTRA_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(key);
    TEAMS
        .iter()
        .find(|t| t.abbr == key)
        .or_else(|| TEAMS.iter().find(|t| t.espn_abbr == key))
}

pub fn canonical_abbreviation(raw: &str) -> Option<&'static str> {
    find_team(raw).map(|t| t.abbr)
}

/// Matches a full or partial team name ("Los Angeles Clippers", "Clippers").
pub fn find_team_by_name(name: &str) -> Option<&'static Team> {
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return None;
    }
    TEAMS
        .iter()
        .find(|t| normalize_name(t.name) == wanted)
        .or_else(|| {
            // Longest nickname wins: "hornets" also ends with "nets".
            TEAMS
                .iter()
                .filter(|t| wanted.ends_with(&normalize_name(t.nickname)))
                .max_by_key(|t| t.nickname.len())
        })
}

pub fn find_team_by_espn_id(id: u16) -> Option<&'static Team> {
    TEAMS.iter().find(|t| t.espn_id == id)
}

/// Never fails; unknown codes keep the upper-cased input with no name or logo.
pub fn resolve_team(raw: &str) -> TeamBadge {
    match find_team(raw) {
        Some(t) => t.badge(),
        None => TeamBadge {
            abbreviation: raw.trim().to_ascii_uppercase(),
            name: None,
            logo: None,
        },
    }
}

fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn provider_divergences_map_to_canonical() {
        assert_eq!(canonical_abbreviation("GS"), Some("GSW"));
        assert_eq!(canonical_abbreviation("gsw"), Some("GSW"));
        assert_eq!(canonical_abbreviation("UTAH"), Some("UTA"));
        assert_eq!(canonical_abbreviation("NO"), Some("NOP"));
        assert_eq!(canonical_abbreviation("SA"), Some("SAS"));
        assert_eq!(canonical_abbreviation("NY"), Some("NYK"));
        assert_eq!(canonical_abbreviation("WSH"), Some("WAS"));
        assert_eq!(canonical_abbreviation("BRK"), Some("BKN"));
        assert_eq!(canonical_abbreviation("PHO"), Some("PHX"));
    }

    #[test]
    fn unknown_abbreviation_resolves_to_empty_badge() {
        let badge = resolve_team(" xyz ");
        assert_eq!(badge.abbreviation, "XYZ");
        assert!(badge.name.is_none());
        assert!(badge.logo.is_none());
        assert!(find_team("").is_none());
    }

    #[test]
    fn known_team_badge_has_name_and_logo() {
        let badge = resolve_team("GS");
        assert_eq!(badge.abbreviation, "GSW");
        assert_eq!(badge.name.as_deref(), Some("Golden State Warriors"));
        assert_eq!(
            badge.logo.as_deref(),
            Some("https://a.espncdn.com/i/teamlogos/nba/500/gs.png")
        );
    }

    #[test]
    fn names_match_across_providers() {
        assert_eq!(find_team_by_name("Los Angeles Clippers").map(|t| t.abbr), Some("LAC"));
        assert_eq!(find_team_by_name("LA Clippers").map(|t| t.abbr), Some("LAC"));
        assert_eq!(find_team_by_name("Portland Trail Blazers").map(|t| t.abbr), Some("POR"));
        assert_eq!(find_team_by_name("Philadelphia 76ers").map(|t| t.abbr), Some("PHI"));
        assert_eq!(find_team_by_name("Hornets").map(|t| t.abbr), Some("CHA"));
        assert!(find_team_by_name("Seattle SuperSonics").is_none());
    }

    #[test]
    fn table_has_unique_keys() {
        let abbrs: HashSet<_> = TEAMS.iter().map(|t| t.abbr).collect();
        let espn: HashSet<_> = TEAMS.iter().map(|t| t.espn_abbr).collect();
        let ids: HashSet<_> = TEAMS.iter().map(|t| t.espn_id).collect();
        assert_eq!(abbrs.len(), 30);
        assert_eq!(espn.len(), 30);
        assert_eq!(ids.len(), 30);
        assert_eq!(find_team_by_espn_id(9).map(|t| t.abbr), Some("GSW"));
    }
}
