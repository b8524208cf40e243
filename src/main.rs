use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hoop_forecast::compare::ForecastEngine;
use hoop_forecast::config::EngineConfig;
use hoop_forecast::game_log::{NbaStatsClient, PlayerGameLog};
use hoop_forecast::market_line::{MarketLookup, TheOddsApiClient};
use hoop_forecast::model::ComparisonResult;
use hoop_forecast::predictor;
use hoop_forecast::roster::{self, RosterPlayer};
use hoop_forecast::schedule::EspnSchedule;

#[derive(Parser)]
#[command(name = "hoop_forecast", version, about = "Player points forecast vs. the market line")]
struct Cli {
    /// Print pretty JSON instead of a text report
    #[arg(long, global = true)]
    json: bool,

    /// Season label such as 2024-25 (defaults to the current season)
    #[arg(long, global = true, env = "NBA_SEASON")]
    season: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict points and compare against the betting line
    Compare { player: String },
    /// Recent games and the prediction, without market data
    Stats { player: String },
    /// Points line for a player
    Odds { player: String },
    /// Search team rosters by name
    Search { name: String },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let cli = Cli::parse();
    let cfg = EngineConfig::from_env();

    match &cli.command {
        Command::Compare { player } => {
            let engine = build_engine(&cfg, cli.season.as_deref());
            match engine.compare(player) {
                Ok(result) => emit(cli.json, &result, print_comparison),
                Err(err) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&err.to_body())?);
                    }
                    Err(err).context(format!("compare failed for {player}"))
                }
            }
        }
        Command::Stats { player } => {
            let engine = build_engine(&cfg, cli.season.as_deref());
            let log = engine
                .game_log(player)
                .with_context(|| format!("no game log for {player}"))?;
            let report = StatsReport::from_log(log);
            emit(cli.json, &report, print_stats)
        }
        Command::Odds { player } => {
            let engine = build_engine(&cfg, cli.season.as_deref());
            let (identity, lookup) = engine
                .market_line(player)
                .with_context(|| format!("odds lookup failed for {player}"))?;
            match lookup {
                MarketLookup::Line(line) => emit(cli.json, &line, |line| {
                    println!(
                        "{}: {} (over {} / under {}) via {}{}",
                        identity.display_name,
                        line.line.map(|l| format!("{l:.1}")).unwrap_or_else(|| "-".into()),
                        price(line.over_price),
                        price(line.under_price),
                        line.source.label(),
                        line.bookmaker
                            .as_deref()
                            .map(|b| format!(" ({b})"))
                            .unwrap_or_default(),
                    );
                }),
                MarketLookup::NoLine(reason) => {
                    anyhow::bail!("no line for {}: {reason}", identity.display_name)
                }
            }
        }
        Command::Search { name } => {
            let players = roster::search_players(&cfg.espn, name)
                .with_context(|| format!("roster search failed for {name}"))?;
            emit(cli.json, &players, print_search)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,hoop_forecast=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_engine(cfg: &EngineConfig, season: Option<&str>) -> ForecastEngine {
    let mut stats = NbaStatsClient::new(cfg.stats.clone());
    if let Some(season) = season {
        stats = stats.with_season(season);
    }
    ForecastEngine::new(
        Box::new(stats),
        Box::new(TheOddsApiClient::new(cfg.odds.clone())),
        Box::new(EspnSchedule::new(cfg.espn.clone())),
    )
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn price(p: Option<i32>) -> String {
    match p {
        Some(p) if p > 0 => format!("+{p}"),
        Some(p) => p.to_string(),
        None => "-".to_string(),
    }
}

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    log: PlayerGameLog,
    prediction: Option<hoop_forecast::model::Prediction>,
}

impl StatsReport {
    fn from_log(log: PlayerGameLog) -> Self {
        let prediction = (log.games.len() >= hoop_forecast::model::MIN_GAMES_FOR_PREDICTION)
            .then(|| predictor::predict(&log.games));
        Self { log, prediction }
    }
}

fn print_comparison(r: &ComparisonResult) {
    let team = r.team.name.as_deref().unwrap_or(&r.team.abbreviation);
    println!("{} ({team})", r.player.display_name);
    println!(
        "  predicted {:.1} pts  confidence {:.1}%  margin ±{:.1}",
        r.prediction.predicted_points, r.prediction.confidence, r.prediction.error_margin
    );
    if let Some(line) = r.market_line.line {
        println!(
            "  line {line:.1} ({}) over {} / under {}",
            r.market_line.source.label(),
            price(r.market_line.over_price),
            price(r.market_line.under_price)
        );
    }
    match r.edge {
        Some(edge) => println!("  => {} (edge {edge:+.1})", r.recommendation.label()),
        None => println!("  => {}", r.recommendation.label()),
    }
    if let Some(next) = &r.next_fixture {
        let opp = r
            .opponent
            .as_ref()
            .and_then(|o| o.name.as_deref())
            .unwrap_or(&next.opponent_abbreviation);
        let venue = if next.is_home { "vs" } else { "@" };
        println!("  next: {venue} {opp} on {} {}", next.date, next.time);
    }
    for note in &r.notes {
        println!("  note: {note}");
    }
}

fn print_stats(report: &StatsReport) {
    let log = &report.log;
    println!("{} ({})", log.player.display_name, log.player.team_abbreviation);
    for g in log.games.games() {
        let venue = if g.is_home { "vs" } else { "@" };
        let date = g.date.map(|d| d.to_string()).unwrap_or_else(|| "----------".into());
        println!(
            "  #{:<2} {date} {venue:>2} {:<4} {:>3} pts {:>5.1} min",
            g.sequence_number, g.opponent_abbreviation, g.points, g.minutes
        );
    }
    if let Some(p) = &report.prediction {
        println!(
            "  predicted {:.1} pts (confidence {:.1}%, ±{:.1})",
            p.predicted_points, p.confidence, p.error_margin
        );
    }
}

fn print_search(players: &Vec<RosterPlayer>) {
    if players.is_empty() {
        println!("no players found");
    }
    for p in players {
        println!(
            "  {:<28} {:<4} {:<3} #{}",
            p.display_name,
            p.team_abbreviation,
            p.position.as_deref().unwrap_or("-"),
            p.jersey.as_deref().unwrap_or("-")
        );
    }
}
