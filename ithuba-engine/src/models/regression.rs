use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

use super::{confidence_from_scores, pick_bonus, top_k, PredictionModel};

/// Regression-toward-the-mean style: scores each number by how overdue it is,
/// current gap over historical mean gap, raised to `gamma`.
pub struct RegressionModel {
    gamma: f64,
}

impl RegressionModel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl PredictionModel for RegressionModel {
    fn name(&self) -> &str {
        "regression"
    }

    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction> {
        let pool = game.pool_size() as usize;
        let theoretical_gap = pool as f64 / game.pick_count() as f64;

        // Current gap: draws since last appearance (draws[0] most recent).
        let mut gaps = vec![draws.len(); pool];
        for (t, draw) in draws.iter().enumerate() {
            for &n in &draw.main_numbers {
                let idx = (n - 1) as usize;
                if idx < pool && gaps[idx] == draws.len() {
                    gaps[idx] = t;
                }
            }
        }

        // Mean gap between appearances, per number.
        let mut mean_gaps = vec![theoretical_gap; pool];
        for i in 0..pool {
            let number = (i + 1) as u8;
            let mut intervals = Vec::new();
            let mut last_seen: Option<usize> = None;
            for (t, draw) in draws.iter().enumerate() {
                if draw.main_numbers.contains(&number) {
                    if let Some(previous) = last_seen {
                        intervals.push((t - previous) as f64);
                    }
                    last_seen = Some(t);
                }
            }
            if !intervals.is_empty() {
                mean_gaps[i] = intervals.iter().sum::<f64>() / intervals.len() as f64;
            }
        }

        let scores: Vec<f64> = (0..pool)
            .map(|i| ((gaps[i] as f64 + 1.0) / mean_gaps[i].max(1.0)).powf(self.gamma))
            .collect();

        let main_numbers = top_k(&scores, game.pick_count());
        let confidence = confidence_from_scores(&scores, &main_numbers);
        let bonus_numbers = pick_bonus(game, draws, &main_numbers);

        Ok(ModelPrediction {
            model: self.name().to_string(),
            main_numbers,
            bonus_numbers,
            confidence,
            reasoning: format!(
                "Most overdue numbers by gap ratio (gamma {}) across {} draws",
                self.gamma,
                draws.len()
            ),
        })
    }
}
