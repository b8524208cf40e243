use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use hoop_forecast::backtest::walk_forward;
use hoop_forecast::game_log::parse_points_history;
use hoop_forecast::model::MIN_GAMES_FOR_PREDICTION;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/playergamelog.json"));
    let min_history = args
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(MIN_GAMES_FOR_PREDICTION);

    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let points = parse_points_history(&raw).context("parsing game log")?;

    // Offline only: replays the predictor over a saved payload, no network.
    let report = walk_forward(&points, min_history);

    println!("Games: {}", points.len());
    println!("Samples: {}", report.samples);
    println!("MAE: {:.1}", report.mean_abs_error);
    println!("RMSE: {:.1}", report.rmse);
    println!("Bias: {:+.1}", report.bias);
    println!("Within margin: {:.1}%", report.within_margin_rate * 100.0);

    Ok(())
}
