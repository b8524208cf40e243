use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure from one upstream provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{adapter} timed out after {secs}s")]
    Timeout { adapter: &'static str, secs: u64 },

    #[error("{adapter} request failed: {message}")]
    Transport {
        adapter: &'static str,
        message: String,
    },

    #[error("{adapter} returned http {status}: {snippet}")]
    Status {
        adapter: &'static str,
        status: u16,
        snippet: String,
    },

    #[error("{adapter} sent an unexpected payload: {message}")]
    Parse {
        adapter: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn adapter(&self) -> &'static str {
        match self {
            UpstreamError::Timeout { adapter, .. }
            | UpstreamError::Transport { adapter, .. }
            | UpstreamError::Status { adapter, .. }
            | UpstreamError::Parse { adapter, .. } => adapter,
        }
    }

    pub fn parse(adapter: &'static str, message: impl Into<String>) -> Self {
        UpstreamError::Parse {
            adapter,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Fatal outcomes of a comparison.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("insufficient game data for {player}: need at least {required} games, got {games}")]
    InsufficientHistory {
        player: String,
        games: usize,
        required: usize,
    },

    #[error("market line unavailable: {reason}")]
    MarketDataUnavailable { reason: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl CompareError {
    pub fn kind(&self) -> &'static str {
        match self {
            CompareError::PlayerNotFound(_) => "PlayerNotFound",
            CompareError::InsufficientHistory { .. } => "InsufficientHistory",
            CompareError::MarketDataUnavailable { .. } => "MarketDataUnavailable",
            CompareError::Upstream(_) => "UpstreamTransportError",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<FetchError> for CompareError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(who) => CompareError::PlayerNotFound(who),
            FetchError::Upstream(e) => CompareError::Upstream(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_message_carries_count() {
        let err = CompareError::InsufficientHistory {
            player: "Test Player".to_string(),
            games: 2,
            required: 3,
        };
        assert_eq!(err.kind(), "InsufficientHistory");
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn parse_errors_surface_as_upstream_kind() {
        let err: CompareError = UpstreamError::parse("nba_stats", "missing PTS column").into();
        assert_eq!(err.kind(), "UpstreamTransportError");
        assert!(err.to_string().contains("nba_stats"));
    }

    #[test]
    fn fetch_not_found_maps_to_player_not_found() {
        let err: CompareError = FetchError::NotFound("Nobody".to_string()).into();
        assert_eq!(err, CompareError::PlayerNotFound("Nobody".to_string()));
        let body = err.to_body();
        assert_eq!(body.error, "PlayerNotFound");
        assert_eq!(body.message, "player not found: Nobody");
    }

    #[test]
    fn timeout_names_adapter() {
        let err = UpstreamError::Timeout {
            adapter: "the_odds_api",
            secs: 10,
        };
        assert_eq!(err.adapter(), "the_odds_api");
        assert_eq!(err.to_string(), "the_odds_api timed out after 10s");
    }
}
