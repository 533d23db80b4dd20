use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

use super::{confidence_from_scores, effective_window, main_counts, pick_bonus, top_k, PredictionModel};

/// Picks the numbers with the highest smoothed appearance rate: Beta(1,1)
/// posterior mean per number over the lookback window.
pub struct FrequencyModel {
    window: usize,
}

impl FrequencyModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl PredictionModel for FrequencyModel {
    fn name(&self) -> &str {
        "frequency"
    }

    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction> {
        let pool = game.pool_size() as usize;
        let window = effective_window(draws, self.window);
        let counts = main_counts(draws, pool, self.window);
        let scores: Vec<f64> = counts
            .iter()
            .map(|&c| (1.0 + c as f64) / (2.0 + window as f64))
            .collect();

        let main_numbers = top_k(&scores, game.pick_count());
        let confidence = confidence_from_scores(&scores, &main_numbers);
        let bonus_numbers = pick_bonus(game, &draws[..window], &main_numbers);

        Ok(ModelPrediction {
            model: self.name().to_string(),
            main_numbers,
            bonus_numbers,
            confidence,
            reasoning: format!(
                "Highest Beta-posterior appearance rates over the last {} draws",
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
            let prediction = FrequencyModel::new(100).predict(game, &draws).unwrap();
            assert_valid_prediction(game, &prediction);
        }
    }

    #[test]
    fn test_picks_recurring_numbers() {
        let game = Game::DailyLotto;
        let draws = make_test_draws(game, 50);
        let prediction = FrequencyModel::new(100).predict(game, &draws).unwrap();
        let counts = main_counts(&draws, game.pool_size() as usize, 0);
        for &n in &prediction.main_numbers {
            assert!(counts[(n - 1) as usize] > 0, "picked an absent number {}", n);
        }
        assert!(prediction.confidence > 0.5);
    }

    #[test]
    fn test_empty_history_degrades_to_lowest_numbers() {
        let game = Game::Lotto;
        let prediction = FrequencyModel::new(100).predict(game, &[]).unwrap();
        assert_valid_prediction(game, &prediction);
        // All posteriors equal, so ties resolve to the smallest numbers.
        assert_eq!(prediction.main_numbers, vec![1, 2, 3, 4, 5, 6]);
        assert!((prediction.confidence - 0.5).abs() < 1e-12);
    }
}
