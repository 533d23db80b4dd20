use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use ithuba_db::models::{Draw, Game};

use crate::divisions::{score_prediction, ticket_price};
use crate::ensemble::{self, EnsembleConfig};
use crate::hypergeom;
use crate::models::{anomaly::AnomalyModel, frequency::FrequencyModel, regression::RegressionModel, PredictionModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Ensemble,
    Frequency,
    Overdue,
    Cold,
    Random,
}

impl Strategy {
    pub fn all() -> [Strategy; 5] {
        [
            Strategy::Ensemble,
            Strategy::Frequency,
            Strategy::Overdue,
            Strategy::Cold,
            Strategy::Random,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Strategy::Ensemble => "ensemble",
            Strategy::Frequency => "frequency",
            Strategy::Overdue => "overdue",
            Strategy::Cold => "cold",
            Strategy::Random => "random",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl std::str::FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ensemble" => Ok(Strategy::Ensemble),
            "frequency" => Ok(Strategy::Frequency),
            "overdue" => Ok(Strategy::Overdue),
            "cold" => Ok(Strategy::Cold),
            "random" => Ok(Strategy::Random),
            other => bail!("Unknown strategy: '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub strategy: Strategy,
    /// Draws required before the first simulated prediction.
    pub min_history: usize,
    /// Training window cap in draws (0 = everything available).
    pub window: usize,
    /// Only replay the most recent N eligible draws (0 = all).
    pub max_draws: usize,
    /// Seed for the random strategy.
    pub seed: u64,
    /// Per-draw ensemble deadline; local models answer in milliseconds.
    pub timeout: Duration,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Frequency,
            min_history: 30,
            window: 200,
            max_draws: 0,
            seed: 42,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Aggregate replay result. Accuracy is reported next to the uniform-random
/// expectation so the null baseline is always visible; no significance
/// testing is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub game: String,
    pub strategy: String,
    pub draws_tested: u32,
    /// Index = number of main matches.
    pub match_histogram: Vec<u32>,
    pub bonus_hits: u32,
    pub division_counts: BTreeMap<String, u32>,
    pub total_spend: f64,
    pub total_winnings: f64,
    pub roi: f64,
    pub mean_main_matches: f64,
    pub expected_random_matches: f64,
}

fn simulate_ticket(
    game: Game,
    train: &[Draw],
    config: &BacktestConfig,
    rng: &mut StdRng,
) -> Result<(Vec<u8>, Vec<u8>)> {
    match config.strategy {
        Strategy::Ensemble => {
            let ensemble_config = EnsembleConfig {
                timeout: config.timeout,
            };
            let prediction = ensemble::predict(game, train, &HashMap::new(), &ensemble_config)?;
            Ok((prediction.main_numbers, prediction.bonus_numbers))
        }
        Strategy::Frequency => model_ticket(&FrequencyModel::new(config.window), game, train),
        Strategy::Overdue => model_ticket(&RegressionModel::new(1.5), game, train),
        Strategy::Cold => model_ticket(&AnomalyModel::new(config.window), game, train),
        Strategy::Random => Ok(random_ticket(game, rng)),
    }
}

fn model_ticket(
    model: &dyn PredictionModel,
    game: Game,
    train: &[Draw],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let prediction = model.predict(game, train)?;
    Ok((prediction.main_numbers, prediction.bonus_numbers))
}

fn random_ticket(game: Game, rng: &mut StdRng) -> (Vec<u8>, Vec<u8>) {
    let pool = game.pool_size() as usize;
    let mut main: Vec<u8> = rand::seq::index::sample(rng, pool, game.pick_count())
        .into_iter()
        .map(|i| (i + 1) as u8)
        .collect();
    main.sort();
    let bonus = if game.bonus_count() > 0 {
        let bonus_pool = game.bonus_pool_size() as usize;
        if game.bonus_shares_main_pool() {
            // Redraw until the bonus ball misses the main picks.
            loop {
                let candidate =
                    (rand::seq::index::sample(rng, bonus_pool, 1).index(0) + 1) as u8;
                if !main.contains(&candidate) {
                    break vec![candidate];
                }
            }
        } else {
            vec![(rand::seq::index::sample(rng, bonus_pool, 1).index(0) + 1) as u8]
        }
    } else {
        Vec::new()
    };
    (main, bonus)
}

/// Replays a strategy against history. `draws` must be oldest-first; each
/// simulated prediction only sees draws strictly before its target.
pub fn run(
    game: Game,
    draws: &[Draw],
    config: &BacktestConfig,
    mut progress: impl FnMut(usize, usize),
) -> Result<BacktestReport> {
    if draws.len() <= config.min_history {
        bail!(
            "Need more than {} draws for a backtest, have {}",
            config.min_history,
            draws.len()
        );
    }

    let first = if config.max_draws > 0 {
        draws.len().saturating_sub(config.max_draws).max(config.min_history)
    } else {
        config.min_history
    };
    let total = draws.len() - first;

    let picks = game.pick_count();
    let price = ticket_price(game);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut match_histogram = vec![0u32; picks + 1];
    let mut bonus_hits = 0u32;
    let mut division_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut total_spend = 0.0f64;
    let mut total_winnings = 0.0f64;

    for (step, target_index) in (first..draws.len()).enumerate() {
        let start = if config.window > 0 {
            target_index.saturating_sub(config.window)
        } else {
            0
        };
        // Models expect most-recent-first.
        let mut train: Vec<Draw> = draws[start..target_index].to_vec();
        train.reverse();

        let (main, bonus) = simulate_ticket(game, &train, config, &mut rng)
            .with_context(|| format!("Simulated prediction failed at draw index {}", target_index))?;

        let actual = &draws[target_index];
        let (main_matches, bonus_matches, division) = score_prediction(&main, &bonus, actual);
        match_histogram[(main_matches as usize).min(picks)] += 1;
        bonus_hits += bonus_matches;
        total_spend += price;
        if let Some(division) = division {
            *division_counts.entry(division.name.to_string()).or_insert(0) += 1;
            total_winnings += division.prize_estimate;
        }
        progress(step + 1, total);
    }

    let draws_tested = total as u32;
    let mean_main_matches = match_histogram
        .iter()
        .enumerate()
        .map(|(matches, &count)| matches as f64 * count as f64)
        .sum::<f64>()
        / draws_tested as f64;
    let roi = if total_spend > 0.0 {
        (total_winnings - total_spend) / total_spend
    } else {
        0.0
    };

    Ok(BacktestReport {
        game: game.slug().to_string(),
        strategy: config.strategy.slug().to_string(),
        draws_tested,
        match_histogram,
        bonus_hits,
        division_counts,
        total_spend,
        total_winnings,
        roi,
        mean_main_matches,
        expected_random_matches: hypergeom::expected_matches(
            game.pool_size() as usize,
            picks,
            picks,
        ),
    })
}

pub fn save_report(report: &BacktestReport, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Cannot serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Cannot write report to {:?}", path))?;
    Ok(())
}
