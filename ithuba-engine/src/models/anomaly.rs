use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

use super::{effective_window, main_counts, pick_bonus, top_k, PredictionModel};

/// Contrarian member: targets the numbers running furthest below their
/// expected frequency, on the premise that the sample will drift back toward
/// uniform. Deliberately the mirror image of the frequency model.
pub struct AnomalyModel {
    window: usize,
}

impl AnomalyModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl PredictionModel for AnomalyModel {
    fn name(&self) -> &str {
        "anomaly"
    }

    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction> {
        let pool = game.pool_size() as usize;
        let window = effective_window(draws, self.window);
        let counts = main_counts(draws, pool, self.window);
        let expected = window as f64 * game.pick_count() as f64 / pool as f64;

        // Deficit relative to the expected frequency; larger = colder.
        let scores: Vec<f64> = counts
            .iter()
            .map(|&c| {
                if expected > 0.0 {
                    (expected - c as f64) / expected
                } else {
                    0.0
                }
            })
            .collect();

        let main_numbers = top_k(&scores, game.pick_count());

        // Confidence scales with how far the chosen numbers lag expectation,
        // but a cold streak is weak evidence: cap well below the hot models.
        let mean_deficit = main_numbers
            .iter()
            .map(|&n| scores[(n - 1) as usize].max(0.0))
            .sum::<f64>()
            / game.pick_count() as f64;
        let confidence = (0.3 + 0.3 * mean_deficit).clamp(0.0, 0.6);

        let bonus_numbers = pick_bonus(game, &draws[..window], &main_numbers);

        Ok(ModelPrediction {
            model: self.name().to_string(),
            main_numbers,
            bonus_numbers,
            confidence,
            reasoning: format!(
                "Largest frequency deficits vs. expectation over {} draws",
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
            let prediction = AnomalyModel::new(100).predict(game, &draws).unwrap();
            assert_valid_prediction(game, &prediction);
        }
    }

    #[test]
    fn test_prefers_unseen_numbers() {
        let game = Game::Lotto;
        let draws = make_test_draws(game, 50);
        let counts = main_counts(&draws, game.pool_size() as usize, 0);
        let prediction = AnomalyModel::new(100).predict(game, &draws).unwrap();
        // The synthetic history leaves many numbers entirely undrawn; the
        // contrarian picks must all come from those.
        for &n in &prediction.main_numbers {
            assert_eq!(counts[(n - 1) as usize], 0, "number {} was drawn", n);
        }
    }

    #[test]
    fn test_confidence_stays_modest() {
        let game = Game::Powerball;
        let draws = make_test_draws(game, 60);
        let prediction = AnomalyModel::new(100).predict(game, &draws).unwrap();
        assert!(prediction.confidence <= 0.6);
    }
}
