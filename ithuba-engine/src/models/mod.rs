pub mod anomaly;
pub mod frequency;
pub mod hybrid;
pub mod pattern;
pub mod regression;

use anyhow::Result;
use ithuba_db::models::{Draw, Game, ModelPrediction};

/// One analysis style of the ensemble. Implementations must be pure over the
/// supplied history (no I/O): the ensemble runs them on worker threads under
/// a shared deadline.
pub trait PredictionModel: Send + Sync {
    fn name(&self) -> &str;
    /// `draws[0]` is the most recent draw. Returns exactly
    /// `game.pick_count()` unique main numbers plus a bonus pick where the
    /// game has one, with a confidence in [0, 1].
    fn predict(&self, game: Game, draws: &[Draw]) -> Result<ModelPrediction>;
}

/// The five ensemble members.
pub fn all_models() -> Vec<Box<dyn PredictionModel>> {
    vec![
        Box::new(pattern::PatternModel::new(100)),
        Box::new(frequency::FrequencyModel::new(100)),
        Box::new(regression::RegressionModel::new(1.5)),
        Box::new(anomaly::AnomalyModel::new(100)),
        Box::new(hybrid::HybridModel::new(100)),
    ]
}

/// Occurrence counts of main numbers over the window, most recent first.
pub(crate) fn main_counts(draws: &[Draw], pool_size: usize, window: usize) -> Vec<u32> {
    let window = if window == 0 { draws.len() } else { window.min(draws.len()) };
    let mut counts = vec![0u32; pool_size];
    for draw in &draws[..window] {
        for &n in &draw.main_numbers {
            let idx = (n - 1) as usize;
            if idx < pool_size {
                counts[idx] += 1;
            }
        }
    }
    counts
}

/// Draws in the window actually scanned by `main_counts`.
pub(crate) fn effective_window(draws: &[Draw], window: usize) -> usize {
    if window == 0 {
        draws.len()
    } else {
        window.min(draws.len())
    }
}

/// The k highest-scoring numbers, ties to the smaller number, ascending.
pub(crate) fn top_k(scores: &[f64], k: usize) -> Vec<u8> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut picks: Vec<u8> = order.iter().take(k).map(|&i| (i + 1) as u8).collect();
    picks.sort();
    picks
}

/// Ratio-based confidence: 0.5 when the chosen numbers score no better than
/// the pool average, approaching 1.0 as they dominate it.
pub(crate) fn confidence_from_scores(scores: &[f64], picks: &[u8]) -> f64 {
    if scores.is_empty() || picks.is_empty() {
        return 0.5;
    }
    let overall = scores.iter().sum::<f64>() / scores.len() as f64;
    let selected = picks
        .iter()
        .map(|&n| scores[(n - 1) as usize])
        .sum::<f64>()
        / picks.len() as f64;
    if selected + overall <= 0.0 {
        return 0.5;
    }
    (selected / (selected + overall)).clamp(0.0, 1.0)
}

/// Bonus pick for the game, excluding the chosen main numbers where the bonus
/// ball comes from the same machine.
pub(crate) fn pick_bonus(game: Game, draws: &[Draw], main_picks: &[u8]) -> Vec<u8> {
    if game.bonus_count() == 0 {
        return Vec::new();
    }
    let pool_size = game.bonus_pool_size() as usize;
    let mut counts = vec![0u32; pool_size];
    if game.bonus_shares_main_pool() {
        for draw in draws {
            for &n in &draw.main_numbers {
                let idx = (n - 1) as usize;
                if idx < pool_size {
                    counts[idx] += 1;
                }
            }
        }
    } else {
        for draw in draws {
            for &b in &draw.bonus_numbers {
                let idx = (b - 1) as usize;
                if idx < pool_size {
                    counts[idx] += 1;
                }
            }
        }
    }

    let mut best: Option<u8> = None;
    let mut best_count = 0u32;
    for (i, &count) in counts.iter().enumerate() {
        let number = (i + 1) as u8;
        if game.bonus_shares_main_pool() && main_picks.contains(&number) {
            continue;
        }
        if best.is_none() || count > best_count {
            best = Some(number);
            best_count = count;
        }
    }
    best.map(|b| vec![b]).unwrap_or_default()
}

/// Deterministic synthetic history for tests, most recent first. Cycles ten
/// fixed patterns so some numbers recur and others never appear.
pub fn make_test_draws(game: Game, n: usize) -> Vec<Draw> {
    let pool = game.pool_size() as usize;
    (0..n)
        .map(|i| {
            let base = (i % 10) as usize;
            let main_numbers: Vec<u8> = (0..game.pick_count())
                .map(|j| (((base * 7 + j * 5) % pool) + 1) as u8)
                .collect();
            let bonus_numbers = match game.bonus_count() {
                0 => Vec::new(),
                _ if game.bonus_shares_main_pool() => {
                    vec![(((base * 7 + 31) % pool) + 1) as u8]
                }
                _ => vec![((i % game.bonus_pool_size() as usize) + 1) as u8],
            };
            let mut main_numbers = main_numbers;
            main_numbers.sort();
            Draw {
                game,
                draw_number: (1000 + n - i) as u32,
                draw_date: format!("2025-{:02}-{:02}", ((n - i) / 28) % 12 + 1, (n - i) % 28 + 1),
                main_numbers,
                bonus_numbers,
                divisions: vec![],
            }
        })
        .collect()
}

/// Shared assertion for model tests.
#[cfg(test)]
pub(crate) fn assert_valid_prediction(game: Game, prediction: &ModelPrediction) {
    assert_eq!(prediction.main_numbers.len(), game.pick_count());
    let mut unique = prediction.main_numbers.clone();
    unique.dedup();
    assert_eq!(unique.len(), game.pick_count(), "duplicate main numbers");
    assert!(prediction
        .main_numbers
        .iter()
        .all(|&n| n >= 1 && n <= game.pool_size()));
    assert_eq!(prediction.bonus_numbers.len(), game.bonus_count());
    assert!(prediction
        .bonus_numbers
        .iter()
        .all(|&b| b >= 1 && b <= game.bonus_pool_size()));
    if game.bonus_shares_main_pool() {
        for b in &prediction.bonus_numbers {
            assert!(!prediction.main_numbers.contains(b));
        }
    }
    assert!(prediction.confidence >= 0.0 && prediction.confidence <= 1.0);
    assert!(!prediction.reasoning.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ithuba_db::models::validate_draw;

    #[test]
    fn test_make_test_draws_are_valid() {
        for game in Game::all() {
            for draw in make_test_draws(game, 25) {
                validate_draw(game, &draw.main_numbers, &draw.bonus_numbers)
                    .unwrap_or_else(|e| panic!("{}: {}", game, e));
            }
        }
    }

    #[test]
    fn test_top_k_ties_favor_smaller_number() {
        let scores = vec![0.1, 0.5, 0.5, 0.3];
        assert_eq!(top_k(&scores, 2), vec![2, 3]);
        assert_eq!(top_k(&scores, 3), vec![2, 3, 4]);
    }

    #[test]
    fn test_confidence_uniform_is_half() {
        let scores = vec![0.25; 20];
        let picks = vec![1, 2, 3];
        assert!((confidence_from_scores(&scores, &picks) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_peaked_above_half() {
        let mut scores = vec![0.01; 20];
        scores[4] = 0.9;
        scores[9] = 0.9;
        let confidence = confidence_from_scores(&scores, &[5, 10]);
        assert!(confidence > 0.5 && confidence <= 1.0);
    }

    #[test]
    fn test_pick_bonus_avoids_main_picks_for_lotto() {
        let draws = make_test_draws(Game::Lotto, 40);
        // Exclude the whole top of the pool to force the exclusion path.
        let main: Vec<u8> = (1..=6).collect();
        let bonus = pick_bonus(Game::Lotto, &draws, &main);
        assert_eq!(bonus.len(), 1);
        assert!(!main.contains(&bonus[0]));
    }

    #[test]
    fn test_pick_bonus_uses_separate_powerball_pool() {
        let draws = make_test_draws(Game::Powerball, 40);
        let bonus = pick_bonus(Game::Powerball, &draws, &[1, 2, 3, 4, 5]);
        assert_eq!(bonus.len(), 1);
        assert!(bonus[0] >= 1 && bonus[0] <= 20);
    }

    #[test]
    fn test_pick_bonus_empty_for_daily_lotto() {
        let draws = make_test_draws(Game::DailyLotto, 40);
        assert!(pick_bonus(Game::DailyLotto, &draws, &[1, 2, 3, 4, 5]).is_empty());
    }

    #[test]
    fn test_all_models_have_distinct_names() {
        let models = all_models();
        assert_eq!(models.len(), 5);
        let mut names: Vec<&str> = models.iter().map(|m| m.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
