use std::thread;

use tracing::{Span, info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::{CompareError, UpstreamError};
use crate::game_log::{GameLogSource, NbaStatsClient, PlayerGameLog};
use crate::market_line::{MarketLineSource, MarketLookup, TheOddsApiClient};
use crate::model::{
    ComparisonResult, LineSource, MIN_GAMES_FOR_PREDICTION, MarketLine, NextFixture,
    PlayerIdentity, Recommendation, round1,
};
use crate::predictor;
use crate::schedule::{EspnSchedule, ScheduleSource};
use crate::teams::{canonical_abbreviation, resolve_team};

/// Gathers a player's game log, market line and next fixture and merges them
/// into one [`ComparisonResult`].
pub struct ForecastEngine {
    game_logs: Box<dyn GameLogSource>,
    market: Box<dyn MarketLineSource>,
    schedule: Box<dyn ScheduleSource>,
}

impl ForecastEngine {
    pub fn new(
        game_logs: Box<dyn GameLogSource>,
        market: Box<dyn MarketLineSource>,
        schedule: Box<dyn ScheduleSource>,
    ) -> Self {
        Self {
            game_logs,
            market,
            schedule,
        }
    }

    pub fn from_config(cfg: EngineConfig) -> Self {
        Self::new(
            Box::new(NbaStatsClient::new(cfg.stats)),
            Box::new(TheOddsApiClient::new(cfg.odds)),
            Box::new(EspnSchedule::new(cfg.espn)),
        )
    }

    pub fn game_log(&self, player_ref: &str) -> Result<PlayerGameLog, CompareError> {
        Ok(self.game_logs.fetch_game_log(player_ref)?)
    }

    /// Resolves the player through the game-log provider, then asks the market
    /// for a line. "No line" is returned as-is rather than as an error.
    pub fn market_line(
        &self,
        player_ref: &str,
    ) -> Result<(PlayerIdentity, MarketLookup), CompareError> {
        let log = self.game_log(player_ref)?;
        let lookup = self.market.fetch_market_line(&log.player)?;
        Ok((log.player, lookup))
    }

    pub fn compare(&self, player_ref: &str) -> Result<ComparisonResult, CompareError> {
        let span = info_span!("compare", player_ref = %player_ref.trim());
        let _enter = span.enter();

        let PlayerGameLog { player, games } = self.game_log(player_ref)?;
        if games.len() < MIN_GAMES_FOR_PREDICTION {
            return Err(CompareError::InsufficientHistory {
                player: player.display_name.clone(),
                games: games.len(),
                required: MIN_GAMES_FOR_PREDICTION,
            });
        }

        let (market, schedule, prediction) = thread::scope(|s| {
            let market = {
                let span = Span::current();
                let player = &player;
                s.spawn(move || {
                    let _enter = span.enter();
                    self.market.fetch_market_line(player)
                })
            };
            let schedule = {
                let span = Span::current();
                let player = &player;
                s.spawn(move || {
                    let _enter = span.enter();
                    self.schedule_branch(player)
                })
            };
            let prediction = predictor::predict(&games);
            (market.join(), schedule.join(), prediction)
        });

        let market_line = settle_market(market)?;
        let schedule = schedule.unwrap_or_else(|_| {
            warn!("schedule lookup panicked");
            ScheduleBranch::failed("schedule lookup panicked".to_string())
        });

        let mut notes = schedule.notes;
        if market_line.source == LineSource::Default {
            notes.push("market line is a filler value, not a bookmaker quote".to_string());
        }

        let line = market_line.usable_line();
        let recommendation = Recommendation::from_values(Some(prediction.predicted_points), line);
        let edge = line.map(|l| round1(prediction.predicted_points - l));
        // A fallback team only shows on the badge; the identity stays as resolved.
        let team = resolve_team(
            schedule
                .team
                .as_deref()
                .unwrap_or(&player.team_abbreviation),
        );
        let opponent = schedule
            .fixture
            .as_ref()
            .map(|f| resolve_team(&f.opponent_abbreviation));

        info!(
            player = %player.display_name,
            predicted = prediction.predicted_points,
            line = line.unwrap_or_default(),
            recommendation = recommendation.label(),
            has_fixture = schedule.fixture.is_some(),
            "comparison ready"
        );

        Ok(ComparisonResult {
            player,
            games,
            prediction,
            market_line,
            recommendation,
            edge,
            team,
            next_fixture: schedule.fixture,
            opponent,
            notes,
        })
    }

    /// Best-effort team resolution and fixture lookup. Never fails; every
    /// degradation is recorded as a note.
    fn schedule_branch(&self, player: &PlayerIdentity) -> ScheduleBranch {
        let mut notes = Vec::new();
        let team = match canonical_abbreviation(&player.team_abbreviation) {
            Some(abbr) => Some(abbr.to_string()),
            None => match self.schedule.search_team(player) {
                Ok(Some(found)) => {
                    info!(player = %player.display_name, team = %found, "team from roster search");
                    Some(found)
                }
                Ok(None) => {
                    notes.push(format!("team for {} could not be resolved", player.display_name));
                    None
                }
                Err(err) => {
                    warn!(adapter = err.adapter(), error = %err, "team fallback failed");
                    notes.push(format!("team lookup failed: {err}"));
                    None
                }
            },
        };

        let Some(abbr) = team.as_deref() else {
            return ScheduleBranch {
                team,
                fixture: None,
                notes,
            };
        };
        let fixture = match self
            .schedule
            .fetch_next_fixture(abbr, Some(&player.display_name))
        {
            Ok(fixture) => fixture,
            Err(err) => {
                warn!(adapter = err.adapter(), error = %err, "schedule unavailable");
                notes.push(format!("schedule unavailable: {err}"));
                None
            }
        };
        ScheduleBranch {
            team,
            fixture,
            notes,
        }
    }
}

struct ScheduleBranch {
    team: Option<String>,
    fixture: Option<NextFixture>,
    notes: Vec<String>,
}

impl ScheduleBranch {
    fn failed(note: String) -> Self {
        Self {
            team: None,
            fixture: None,
            notes: vec![note],
        }
    }
}

type Joined<T> = thread::Result<T>;

/// The market line is load-bearing: anything short of a usable line fails the
/// comparison.
fn settle_market(
    joined: Joined<Result<MarketLookup, UpstreamError>>,
) -> Result<MarketLine, CompareError> {
    let reason = match joined {
        Ok(Ok(MarketLookup::Line(line))) if line.usable_line().is_some() => return Ok(line),
        Ok(Ok(MarketLookup::Line(_))) => "provider returned an empty line".to_string(),
        Ok(Ok(MarketLookup::NoLine(reason))) => reason,
        Ok(Err(err)) => err.to_string(),
        Err(_) => "market line lookup panicked".to_string(),
    };
    warn!(reason = %reason, "market line unavailable");
    Err(CompareError::MarketDataUnavailable { reason })
}
