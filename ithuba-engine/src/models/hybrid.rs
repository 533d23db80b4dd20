use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

use super::{confidence_from_scores, effective_window, main_counts, pick_bonus, top_k, PredictionModel};

/// Equal blend of the frequency signal (smoothed appearance rate) and the
/// overdue signal (current gap over the window), each normalized to its own
/// maximum before mixing.
pub struct HybridModel {
    window: usize,
}

impl HybridModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

fn normalized(values: Vec<f64>) -> Vec<f64> {
    let max = values.iter().cloned().fold(0.0f64, f64::max);
    if max <= 0.0 {
        return values;
    }
    values.into_iter().map(|v| v / max).collect()
}

impl PredictionModel for HybridModel {
    fn name(&self) -> &str {
        "hybrid"
    }

    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction> {
        let pool = game.pool_size() as usize;
        let window = effective_window(draws, self.window);
        let recent = &draws[..window];

        let counts = main_counts(draws, pool, self.window);
        let frequency: Vec<f64> = counts
            .iter()
            .map(|&c| (1.0 + c as f64) / (2.0 + window as f64))
            .collect();

        let mut gaps = vec![window; pool];
        for (t, draw) in recent.iter().enumerate() {
            for &n in &draw.main_numbers {
                let idx = (n - 1) as usize;
                if idx < pool && gaps[idx] == window {
                    gaps[idx] = t;
                }
            }
        }
        let gap_scores: Vec<f64> = gaps.iter().map(|&g| g as f64).collect();

        let frequency = normalized(frequency);
        let gap_scores = normalized(gap_scores);
        let scores: Vec<f64> = frequency
            .iter()
            .zip(gap_scores.iter())
            .map(|(f, g)| 0.5 * f + 0.5 * g)
            .collect();

        let main_numbers = top_k(&scores, game.pick_count());
        let confidence = confidence_from_scores(&scores, &main_numbers);
        let bonus_numbers = pick_bonus(game, recent, &main_numbers);

        Ok(ModelPrediction {
            model: self.name().to_string(),
            main_numbers,
            bonus_numbers,
            confidence,
            reasoning: format!(
                "Even blend of appearance rate and current gap over {} draws",
                window
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{assert_valid_prediction, make_test_draws};

    #[test]
    fn test_prediction_shape() {
        for game in Game::all() {
            let draws = make_test_draws(game, 60);
            let prediction = HybridModel::new(100).predict(game, &draws).unwrap();
            assert_valid_prediction(game, &prediction);
        }
    }

    #[test]
    fn test_differs_from_pure_frequency_ranking() {
        let game = Game::Lotto;
        let draws = make_test_draws(game, 50);
        let hybrid = HybridModel::new(100).predict(game, &draws).unwrap();
        let frequency = super::super::frequency::FrequencyModel::new(100)
            .predict(game, &draws)
            .unwrap();
        // The gap term pulls in undrawn numbers, which pure frequency never
        // ranks on top in this history.
        assert_ne!(hybrid.main_numbers, frequency.main_numbers);
    }

    #[test]
    fn test_empty_history_still_valid() {
        let game = Game::DailyLotto;
        let prediction = HybridModel::new(100).predict(game, &[]).unwrap();
        assert_valid_prediction(game, &prediction);
    }
}
