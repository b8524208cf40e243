use std::env;
use std::time::Duration;

const DEFAULT_NBA_STATS_BASE: &str = "https://stats.nba.com/stats";
const DEFAULT_ESPN_BASE: &str = "https://site.web.api.espn.com/apis/site/v2/sports/basketball/nba";
const DEFAULT_ODDS_BASE: &str = "https://api.the-odds-api.com/v4";

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EspnConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub schedule_enabled: bool,
    pub roster_search_enabled: bool,
    pub fetch_parallelism: usize,
}

#[derive(Debug, Clone)]
pub struct OddsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub regions: String,
    pub bookmakers: Option<String>,
    pub timeout: Duration,
    pub max_events: usize,
    pub fallback_line: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub stats: StatsConfig,
    pub espn: EspnConfig,
    pub odds: OddsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| {
            get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let secs = |key: &str, default: u64| {
            let v = text(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
                .clamp(1, 60);
            Duration::from_secs(v)
        };
        let flag = |key: &str, default: bool| get(key).map(|v| parse_bool(&v)).unwrap_or(default);

        let stats = StatsConfig {
            base_url: base_url(text("NBA_STATS_BASE_URL"), DEFAULT_NBA_STATS_BASE),
            timeout: secs("NBA_STATS_TIMEOUT_SECS", 15),
        };

        let espn = EspnConfig {
            base_url: base_url(text("ESPN_BASE_URL"), DEFAULT_ESPN_BASE),
            timeout: secs("ESPN_TIMEOUT_SECS", 10),
            schedule_enabled: flag("SCHEDULE_ENABLED", true),
            roster_search_enabled: flag("ROSTER_SEARCH_ENABLED", true),
            fetch_parallelism: text("FETCH_PARALLELISM")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(6)
                .clamp(2, 32),
        };

        let odds = OddsConfig {
            base_url: base_url(text("ODDS_API_BASE_URL"), DEFAULT_ODDS_BASE),
            // The sample .env ships this placeholder; treat it as unset.
            api_key: text("ODDS_API_KEY").filter(|k| k != "your_theoddsapi_key_here"),
            regions: text("ODDS_REGIONS")
                .unwrap_or_else(|| "us".to_string())
                .to_ascii_lowercase(),
            bookmakers: text("ODDS_BOOKMAKERS").map(|s| s.to_ascii_lowercase()),
            timeout: secs("ODDS_TIMEOUT_SECS", 10),
            max_events: text("ODDS_MAX_EVENTS")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(4)
                .clamp(1, 15),
            fallback_line: text("ODDS_FALLBACK_LINE")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0),
        };

        Self { stats, espn, odds }
    }
}

fn base_url(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_bool(raw: &str) -> bool {
    let t = raw.trim().to_ascii_lowercase();
    !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stats.timeout, Duration::from_secs(15));
        assert_eq!(cfg.odds.timeout, Duration::from_secs(10));
        assert_eq!(cfg.espn.timeout, Duration::from_secs(10));
        assert_eq!(cfg.odds.regions, "us");
        assert_eq!(cfg.odds.max_events, 4);
        assert!(cfg.odds.api_key.is_none());
        assert!(cfg.odds.fallback_line.is_none());
        assert!(cfg.espn.schedule_enabled);
        assert_eq!(cfg.stats.base_url, DEFAULT_NBA_STATS_BASE);
        assert_eq!(cfg.espn.fetch_parallelism, 6);
    }

    #[test]
    fn placeholder_api_key_is_ignored() {
        let cfg = config_from(&[("ODDS_API_KEY", "your_theoddsapi_key_here")]);
        assert!(cfg.odds.api_key.is_none());
        let cfg = config_from(&[("ODDS_API_KEY", " abc123 ")]);
        assert_eq!(cfg.odds.api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn timeouts_are_clamped() {
        let cfg = config_from(&[("ODDS_TIMEOUT_SECS", "0"), ("ESPN_TIMEOUT_SECS", "900")]);
        assert_eq!(cfg.odds.timeout, Duration::from_secs(1));
        assert_eq!(cfg.espn.timeout, Duration::from_secs(60));
    }

    #[test]
    fn flags_and_fallback_line_parse() {
        let cfg = config_from(&[
            ("SCHEDULE_ENABLED", "off"),
            ("ROSTER_SEARCH_ENABLED", "yes"),
            ("ODDS_FALLBACK_LINE", "25.5"),
            ("ESPN_BASE_URL", "http://localhost:9000/nba/"),
        ]);
        assert!(!cfg.espn.schedule_enabled);
        assert!(cfg.espn.roster_search_enabled);
        assert_eq!(cfg.odds.fallback_line, Some(25.5));
        assert_eq!(cfg.espn.base_url, "http://localhost:9000/nba");
    }

    #[test]
    fn invalid_fallback_line_is_dropped() {
        let cfg = config_from(&[("ODDS_FALLBACK_LINE", "-3")]);
        assert!(cfg.odds.fallback_line.is_none());
        let cfg = config_from(&[("ODDS_FALLBACK_LINE", "abc")]);
        assert!(cfg.odds.fallback_line.is_none());
    }
}
