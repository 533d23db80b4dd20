use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use ithuba_db::models::{Draw, Game, ModelPrediction};

use crate::models::{all_models, PredictionModel};

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// Shared deadline for the whole fan-out. A model that has not answered
    /// by then is dropped from the vote.
    pub timeout: Duration,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    pub game: Game,
    pub main_numbers: Vec<u8>,
    pub bonus_numbers: Vec<u8>,
    /// Weighted mean of contributor confidences, capped at 1.0.
    pub confidence: f64,
    /// Weighted vote per main number, strongest first.
    pub votes: Vec<(u8, f64)>,
    pub contributors: Vec<ModelPrediction>,
    /// Models that errored or missed the deadline. Partial success is still
    /// success as long as at least one model answered.
    pub dropped: usize,
    pub reasoning: String,
}

/// Runs the default five-model ensemble. `weights` maps model name to its
/// historical-accuracy share; missing entries get an equal 1/N default.
pub fn predict(
    game: Game,
    draws: &[Draw],
    weights: &HashMap<String, f64>,
    config: &EnsembleConfig,
) -> Result<EnsemblePrediction> {
    predict_with_models(all_models(), game, draws, weights, config)
}

pub fn predict_with_models(
    models: Vec<Box<dyn PredictionModel>>,
    game: Game,
    draws: &[Draw],
    weights: &HashMap<String, f64>,
    config: &EnsembleConfig,
) -> Result<EnsemblePrediction> {
    let model_count = models.len();
    if model_count == 0 {
        bail!("Ensemble has no models");
    }

    // One worker per model, all racing one deadline. Workers own a shared
    // snapshot of the history; a straggler past the deadline keeps running
    // but its send lands on a closed channel.
    let history: Arc<Vec<Draw>> = Arc::new(draws.to_vec());
    let (sender, receiver) = mpsc::channel();
    for model in models {
        let sender = sender.clone();
        let history = Arc::clone(&history);
        thread::spawn(move || {
            let result = model.predict(game, &history);
            let _ = sender.send(result);
        });
    }
    drop(sender);

    let deadline = Instant::now() + config.timeout;
    let mut contributors: Vec<ModelPrediction> = Vec::with_capacity(model_count);
    for _ in 0..model_count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(Ok(prediction)) => contributors.push(prediction),
            Ok(Err(_)) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => break,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    let dropped = model_count - contributors.len();

    if contributors.is_empty() {
        bail!("All {} ensemble models failed or timed out", model_count);
    }

    combine(game, contributors, dropped, model_count, weights)
}

fn model_weight(weights: &HashMap<String, f64>, name: &str, model_count: usize) -> f64 {
    weights
        .get(name)
        .copied()
        .unwrap_or(1.0 / model_count as f64)
}

fn combine(
    game: Game,
    contributors: Vec<ModelPrediction>,
    dropped: usize,
    model_count: usize,
    weights: &HashMap<String, f64>,
) -> Result<EnsemblePrediction> {
    let mut main_votes: HashMap<u8, f64> = HashMap::new();
    let mut bonus_votes: HashMap<u8, f64> = HashMap::new();
    let mut weight_sum = 0.0f64;
    let mut weighted_confidence = 0.0f64;

    for prediction in &contributors {
        let weight = model_weight(weights, &prediction.model, model_count);
        let vote = weight * prediction.confidence;
        for &n in &prediction.main_numbers {
            *main_votes.entry(n).or_insert(0.0) += vote;
        }
        for &b in &prediction.bonus_numbers {
            *bonus_votes.entry(b).or_insert(0.0) += vote;
        }
        weight_sum += weight;
        weighted_confidence += weight * prediction.confidence;
    }

    let confidence = if weight_sum > 0.0 {
        (weighted_confidence / weight_sum).min(1.0)
    } else {
        0.0
    };

    let mut votes: Vec<(u8, f64)> = main_votes.into_iter().collect();
    votes.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut main_numbers: Vec<u8> = votes
        .iter()
        .take(game.pick_count())
        .map(|&(n, _)| n)
        .collect();
    // Every contributor proposes a full set, so this only fires on a
    // malformed model; still, never return a short ticket.
    let mut filler = 1u8;
    while main_numbers.len() < game.pick_count() {
        if !main_numbers.contains(&filler) {
            main_numbers.push(filler);
        }
        filler += 1;
    }
    main_numbers.sort();

    let mut bonus_ranked: Vec<(u8, f64)> = bonus_votes.into_iter().collect();
    bonus_ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    // Contributors exclude their own mains from the bonus, but the combined
    // main set can still collide with the top bonus vote.
    let shares_pool = game.bonus_shares_main_pool();
    let mut bonus_numbers: Vec<u8> = bonus_ranked
        .iter()
        .filter(|&&(b, _)| !(shares_pool && main_numbers.contains(&b)))
        .take(game.bonus_count())
        .map(|&(b, _)| b)
        .collect();
    let mut bonus_filler = 1u8;
    while bonus_numbers.len() < game.bonus_count() {
        if !bonus_numbers.contains(&bonus_filler)
            && !(shares_pool && main_numbers.contains(&bonus_filler))
        {
            bonus_numbers.push(bonus_filler);
        }
        bonus_filler += 1;
    }
    bonus_numbers.sort();

    let styles: Vec<&str> = contributors.iter().map(|c| c.model.as_str()).collect();
    let reasoning = format!(
        "Weighted vote of {} of {} models ({})",
        contributors.len(),
        model_count,
        styles.join(", ")
    );

    Ok(EnsemblePrediction {
        game,
        main_numbers,
        bonus_numbers,
        confidence,
        votes,
        contributors,
        dropped,
        reasoning,
    })
}
