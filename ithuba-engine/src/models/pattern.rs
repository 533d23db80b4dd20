use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

use super::{effective_window, pick_bonus, PredictionModel};

/// Grows a set around pairwise co-occurrence: seeds with the number involved
/// in the most pairs, then greedily adds the number with the strongest
/// affinity to the set so far.
pub struct PatternModel {
    window: usize,
}

impl PatternModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    fn cooccurrence(&self, draws: &[Draw], pool: usize) -> Vec<Vec<u32>> {
        let mut matrix = vec![vec![0u32; pool]; pool];
        for draw in draws {
            let numbers = &draw.main_numbers;
            for i in 0..numbers.len() {
                for j in (i + 1)..numbers.len() {
                    let a = (numbers[i] - 1) as usize;
                    let b = (numbers[j] - 1) as usize;
                    if a < pool && b < pool {
                        matrix[a][b] += 1;
                        matrix[b][a] += 1;
                    }
                }
            }
        }
        matrix
    }
}

impl PredictionModel for PatternModel {
    fn name(&self) -> &str {
        "pattern"
    }

    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction> {
        let pool = game.pool_size() as usize;
        let window = effective_window(draws, self.window);
        let matrix = self.cooccurrence(&draws[..window], pool);

        // Seed: the number with the largest total pair count.
        let totals: Vec<u32> = matrix.iter().map(|row| row.iter().sum()).collect();
        let seed = totals
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut selected = vec![seed];
        while selected.len() < game.pick_count() {
            let mut best: Option<(usize, u32)> = None;
            for candidate in 0..pool {
                if selected.contains(&candidate) {
                    continue;
                }
                let affinity: u32 = selected.iter().map(|&s| matrix[s][candidate]).sum();
                if best.map_or(true, |(_, a)| affinity > a) {
                    best = Some((candidate, affinity));
                }
            }
            match best {
                Some((candidate, _)) => selected.push(candidate),
                None => break,
            }
        }

        let mut main_numbers: Vec<u8> = selected.iter().map(|&i| (i + 1) as u8).collect();
        main_numbers.sort();

        // Confidence from how concentrated the set's pair mass is relative to
        // the average pair in the window.
        let pair_count = game.pick_count() * (game.pick_count() - 1) / 2;
        let selected_pairs: u32 = selected
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| selected[i + 1..].iter().map(move |&b| (a, b)))
            .map(|(a, b)| matrix[a][b])
            .sum();
        let selected_mean = selected_pairs as f64 / pair_count.max(1) as f64;
        let overall_mean = totals.iter().sum::<u32>() as f64 / (pool * pool) as f64;
        let confidence = if selected_mean + overall_mean > 0.0 {
            (selected_mean / (selected_mean + overall_mean)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let bonus_numbers = pick_bonus(game, &draws[..window], &main_numbers);

        Ok(ModelPrediction {
            model: self.name().to_string(),
            main_numbers,
            bonus_numbers,
            confidence,
            reasoning: format!(
                "Greedy pair-affinity set over {} draws, seeded at {}",
                window,
                seed + 1
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
            let prediction = PatternModel::new(100).predict(game, &draws).unwrap();
            assert_valid_prediction(game, &prediction);
        }
    }

    #[test]
    fn test_recovers_a_recurring_pattern() {
        // One pattern dominates the synthetic history (base repeats every 10
        // draws), so the greedy set should land entirely on seen numbers.
        let game = Game::DailyLotto;
        let draws = make_test_draws(game, 50);
        let prediction = PatternModel::new(100).predict(game, &draws).unwrap();
        let seen: Vec<u8> = draws
            .iter()
            .flat_map(|d| d.main_numbers.iter().copied())
            .collect();
        for n in &prediction.main_numbers {
            assert!(seen.contains(n));
        }
    }

    #[test]
    fn test_empty_history_still_valid() {
        let game = Game::Powerball;
        let prediction = PatternModel::new(100).predict(game, &[]).unwrap();
        assert_valid_prediction(game, &prediction);
        assert!((prediction.confidence - 0.5).abs() < 1e-12);
    }
}
