mod display;
mod import;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use ithuba_db::db::{
    bump_model_accuracy, count_draws, db_path, fetch_draws_ascending, fetch_last_draws,
    fetch_model_weights, fetch_prediction, insert_draw, latest_draw, migrate, open_db,
    record_validation, upsert_prediction, NewPrediction,
};
use ithuba_db::models::{validate_draw, Draw, Game};
use ithuba_db::rusqlite::Connection;
use ithuba_engine::backtest::{self, BacktestConfig, Strategy};
use ithuba_engine::divisions::score_prediction;
use ithuba_engine::ensemble::{self, EnsembleConfig};
use ithuba_engine::estimator::{CachedEstimator, EstimatorConfig};
use ithuba_engine::wheel::{build_wheel, WheelConfig};

use crate::display::{
    display_backtest, display_draws, display_import_summary, display_prediction,
    display_probabilities, display_stored_prediction, display_wheel,
};
use crate::import::{import_csv, parse_numbers};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GameArg {
    Lotto,
    LottoPlus1,
    LottoPlus2,
    Powerball,
    PowerballPlus,
    DailyLotto,
}

impl From<GameArg> for Game {
    fn from(arg: GameArg) -> Game {
        match arg {
            GameArg::Lotto => Game::Lotto,
            GameArg::LottoPlus1 => Game::LottoPlus1,
            GameArg::LottoPlus2 => Game::LottoPlus2,
            GameArg::Powerball => Game::Powerball,
            GameArg::PowerballPlus => Game::PowerballPlus,
            GameArg::DailyLotto => Game::DailyLotto,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StrategyArg {
    Ensemble,
    #[default]
    Frequency,
    Overdue,
    Cold,
    Random,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Strategy {
        match arg {
            StrategyArg::Ensemble => Strategy::Ensemble,
            StrategyArg::Frequency => Strategy::Frequency,
            StrategyArg::Overdue => Strategy::Overdue,
            StrategyArg::Cold => Strategy::Cold,
            StrategyArg::Random => Strategy::Random,
        }
    }
}

#[derive(Parser)]
#[command(name = "ithuba", about = "South African lottery draw analyser")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import draws from a CSV file
    Import {
        /// Path to the CSV file (game, draw_number, draw_date, main_numbers, bonus_numbers)
        file: PathBuf,
    },

    /// Print the database path
    DbPath,

    /// List the most recent draws of a game
    List {
        #[arg(short, long)]
        game: GameArg,

        /// Number of draws to show
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Show per-number probabilities, hot/cold tags and pool coverage
    Stats {
        #[arg(short, long)]
        game: GameArg,

        /// Analysis window in draws (0 = full history)
        #[arg(short, long, default_value = "100")]
        window: u32,
    },

    /// Run the five-model ensemble for the next draw
    Predict {
        #[arg(short, long)]
        game: GameArg,

        /// Analysis window in draws (0 = full history)
        #[arg(short, long, default_value = "200")]
        window: u32,

        /// Per-model deadline in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Persist the prediction for later validation
        #[arg(long)]
        store: bool,

        /// Target draw date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Build a budget-capped wheel over the most probable numbers
    Wheel {
        #[arg(short, long)]
        game: GameArg,

        /// Maximum number of lines to buy
        #[arg(short, long, default_value = "10")]
        budget: usize,

        /// Target probability that the draw hits at least 3 pool numbers
        #[arg(short, long, default_value = "0.9")]
        target: f64,

        /// Analysis window in draws (0 = full history)
        #[arg(short, long, default_value = "100")]
        window: u32,
    },

    /// Replay a strategy against history and report simulated winnings
    Backtest {
        #[arg(short, long)]
        game: GameArg,

        #[arg(short, long, default_value = "frequency")]
        strategy: StrategyArg,

        /// Training window in draws (0 = everything before each target)
        #[arg(short, long, default_value = "200")]
        window: usize,

        /// Draws required before the first simulated prediction
        #[arg(long, default_value = "30")]
        min_history: usize,

        /// Only replay the most recent N eligible draws (0 = all)
        #[arg(long, default_value = "0")]
        max_draws: usize,

        /// Seed for the random strategy
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Write the report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a stored prediction against the real draw and update model weights
    Validate {
        #[arg(short, long)]
        game: GameArg,

        /// Draw date to validate against; defaults to the latest stored draw
        #[arg(long)]
        date: Option<String>,
    },

    /// Add a draw manually
    Add {
        #[arg(short, long)]
        game: GameArg,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { game, last } => cmd_list(&conn, game.into(), last),
        Command::Stats { game, window } => cmd_stats(&conn, game.into(), window),
        Command::Predict {
            game,
            window,
            timeout,
            store,
            date,
        } => cmd_predict(&conn, game.into(), window, timeout, store, date),
        Command::Wheel {
            game,
            budget,
            target,
            window,
        } => cmd_wheel(&conn, game.into(), budget, target, window),
        Command::Backtest {
            game,
            strategy,
            window,
            min_history,
            max_draws,
            seed,
            output,
        } => cmd_backtest(
            &conn,
            game.into(),
            strategy.into(),
            window,
            min_history,
            max_draws,
            seed,
            output,
        ),
        Command::Validate { game, date } => cmd_validate(&conn, game.into(), date),
        Command::Add { game } => cmd_add(&conn, game.into()),
    }
}

fn require_draws(conn: &Connection, game: Game) -> Result<bool> {
    let n = count_draws(conn, game)?;
    if n == 0 {
        println!("No {} draws stored. Run: ithuba import <file.csv>", game);
        return Ok(false);
    }
    Ok(true)
}

fn cmd_import(conn: &Connection, file: &PathBuf) -> Result<()> {
    let result = import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, game: Game, last: u32) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, game, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, game: Game, window: u32) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, game, effective_limit(window))?;
    let config = EstimatorConfig {
        window: window as usize,
        ..EstimatorConfig::default()
    };
    let mut estimator = CachedEstimator::new(config, Duration::from_secs(600));
    display_probabilities(&estimator.table(game, &draws));
    Ok(())
}

fn cmd_predict(
    conn: &Connection,
    game: Game,
    window: u32,
    timeout: u64,
    store: bool,
    date: Option<String>,
) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, game, effective_limit(window))?;
    let weights = fetch_model_weights(conn, game)?;
    let config = EnsembleConfig {
        timeout: Duration::from_secs(timeout),
    };

    let prediction = ensemble::predict(game, &draws, &weights, &config)?;
    display_prediction(&prediction);

    if store {
        let target = match date {
            Some(d) => d,
            None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
        };
        let stored = upsert_prediction(
            conn,
            &NewPrediction {
                game,
                target_draw_date: &target,
                main_numbers: &prediction.main_numbers,
                bonus_numbers: &prediction.bonus_numbers,
                confidence: prediction.confidence,
                reasoning: &prediction.reasoning,
                contributors: &prediction.contributors,
            },
        )?;
        if stored {
            println!("\nPrediction stored for {} on {}.", game, target);
        } else {
            println!(
                "\nPrediction for {} on {} is already validated; not overwritten.",
                game, target
            );
        }
    }
    Ok(())
}

fn cmd_wheel(conn: &Connection, game: Game, budget: usize, target: f64, window: u32) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, game, effective_limit(window))?;
    let config = EstimatorConfig {
        window: window as usize,
        ..EstimatorConfig::default()
    };
    let mut estimator = CachedEstimator::new(config, Duration::from_secs(600));
    let table = estimator.table(game, &draws);

    let plan = build_wheel(
        game,
        &table,
        &WheelConfig {
            budget,
            target_coverage: target,
        },
    )?;
    display_wheel(&plan);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_backtest(
    conn: &Connection,
    game: Game,
    strategy: Strategy,
    window: usize,
    min_history: usize,
    max_draws: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_draws_ascending(conn, game)?;

    let config = BacktestConfig {
        strategy,
        min_history,
        window,
        max_draws,
        seed,
        ..BacktestConfig::default()
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.set_message(format!("{} on {}", strategy, game));

    let report = backtest::run(game, &draws, &config, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    display_backtest(&report);

    if let Some(path) = output {
        backtest::save_report(&report, &path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn cmd_validate(conn: &Connection, game: Game, date: Option<String>) -> Result<()> {
    if !require_draws(conn, game)? {
        return Ok(());
    }
    let draw = match date {
        Some(d) => fetch_draws_ascending(conn, game)?
            .into_iter()
            .find(|draw| draw.draw_date == d)
            .with_context(|| format!("No {} draw stored for {}", game, d))?,
        None => latest_draw(conn, game)?.context("No draws stored")?,
    };

    let stored = fetch_prediction(conn, game, &draw.draw_date)?
        .with_context(|| format!("No stored prediction for {} on {}", game, draw.draw_date))?;
    if stored.locked {
        println!("Prediction already validated.");
        display_stored_prediction(&stored);
        return Ok(());
    }

    let (main_matches, bonus_matches, division) =
        score_prediction(&stored.main_numbers, &stored.bonus_numbers, &draw);
    record_validation(
        conn,
        stored.id,
        main_matches,
        bonus_matches,
        division.map(|d| d.name),
    )?;

    // Each contributor's own numbers are scored so the accuracy ledger (and
    // future ensemble weights) reflects individual models, not the blend.
    for contributor in &stored.contributors {
        let (hits, bonus_hits, _) =
            score_prediction(&contributor.main_numbers, &contributor.bonus_numbers, &draw);
        let opportunities =
            (contributor.main_numbers.len() + contributor.bonus_numbers.len()) as u32;
        bump_model_accuracy(
            conn,
            &contributor.model,
            game,
            hits + bonus_hits,
            opportunities,
        )?;
    }

    println!(
        "Validated against {} draw #{} on {}: {} main + {} bonus matches.",
        game, draw.draw_number, draw.draw_date, main_matches, bonus_matches
    );
    match division {
        Some(d) => println!("Prize tier: {} (≈R{:.2})", d.name, d.prize_estimate),
        None => println!("No prize tier reached."),
    }

    let refreshed = fetch_prediction(conn, game, &draw.draw_date)?
        .context("Prediction vanished during validation")?;
    display_stored_prediction(&refreshed);
    Ok(())
}

fn cmd_add(conn: &Connection, game: Game) -> Result<()> {
    println!("Add a {} draw manually\n", game);

    let raw_number = prompt("Draw number (e.g. 2501): ")?;
    let draw_number: u32 = raw_number
        .parse()
        .with_context(|| format!("Invalid draw number '{}'", raw_number))?;
    let draw_date = prompt("Draw date (YYYY-MM-DD): ")?;
    chrono::NaiveDate::parse_from_str(&draw_date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'", draw_date))?;

    let main_numbers = prompt_main(game)?;
    let bonus_numbers = prompt_bonus(game, &main_numbers)?;

    validate_draw(game, &main_numbers, &bonus_numbers)?;

    let draw = Draw {
        game,
        draw_number,
        draw_date,
        main_numbers,
        bonus_numbers,
        divisions: Vec::new(),
    };

    println!("\nDraw to insert:");
    display_draws(&[draw.clone()]);

    let confirm = prompt("\nConfirm insert? (y/n): ")?;
    if confirm.trim().to_lowercase() == "y" {
        if insert_draw(conn, &draw)? {
            println!("Draw inserted.");
        } else {
            println!("This draw already exists (duplicate ignored).");
        }
    } else {
        println!("Insert cancelled.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input).context("Read error")?;
    Ok(input.trim().to_string())
}

fn prompt_main(game: Game) -> Result<Vec<u8>> {
    loop {
        let input = prompt(&format!(
            "{} main numbers (space-separated, 1-{}): ",
            game.pick_count(),
            game.pool_size()
        ))?;
        match parse_numbers(&input) {
            Ok(numbers) if numbers.len() == game.pick_count() => {
                if validate_draw(game, &numbers, &dummy_bonus(game, &numbers)).is_ok() {
                    return Ok(numbers);
                }
                println!("Invalid numbers (range or duplicates). Try again.");
            }
            _ => println!("Enter exactly {} numbers. Try again.", game.pick_count()),
        }
    }
}

fn prompt_bonus(game: Game, main: &[u8]) -> Result<Vec<u8>> {
    if game.bonus_count() == 0 {
        return Ok(Vec::new());
    }
    loop {
        let input = prompt(&format!(
            "Bonus number (1-{}): ",
            game.bonus_pool_size()
        ))?;
        match parse_numbers(&input) {
            Ok(numbers) if numbers.len() == game.bonus_count() => {
                if validate_draw(game, main, &numbers).is_ok() {
                    return Ok(numbers);
                }
                println!("Invalid bonus number. Try again.");
            }
            _ => println!("Enter exactly {} number(s). Try again.", game.bonus_count()),
        }
    }
}

/// A placeholder bonus that passes validation, used while only the main
/// numbers have been entered.
fn dummy_bonus(game: Game, main: &[u8]) -> Vec<u8> {
    if game.bonus_count() == 0 {
        return Vec::new();
    }
    if game.bonus_shares_main_pool() {
        let free = (1..=game.bonus_pool_size())
            .find(|n| !main.contains(n))
            .unwrap_or(1);
        return vec![free];
    }
    vec![1]
}

fn effective_limit(window: u32) -> u32 {
    if window == 0 {
        u32::MAX
    } else {
        window
    }
}
