pub mod backtest;
pub mod compare;
pub mod config;
pub mod error;
pub mod game_log;
pub mod http_client;
pub mod market_line;
pub mod matchup;
pub mod model;
pub mod predictor;
pub mod roster;
pub mod schedule;
pub mod teams;

pub use compare::ForecastEngine;
pub use config::EngineConfig;
pub use error::CompareError;
