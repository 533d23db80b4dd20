use std::time::Duration;

use ithuba_db::models::{Draw, Game, NumberProbability, ProbabilityTag};

use crate::cache::TtlCache;
use crate::hypergeom;

/// Pool sizes reported in every table's coverage summary.
const COVERAGE_POOLS: [usize; 3] = [15, 20, 25];

/// Placeholder coverage shown when there is no history to estimate from.
const FALLBACK_COVERAGE: [f64; 3] = [0.50, 0.60, 0.70];

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Lookback window in draws (0 = use everything supplied).
    pub window: usize,
    /// Short window for the trend blend.
    pub trend_window: usize,
    pub long_weight: f64,
    pub trend_weight: f64,
    /// Relative deviation from expected frequency beyond which a number is
    /// tagged hot (above) or cold (below).
    pub hot_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window: 0,
            trend_window: 30,
            long_weight: 0.7,
            trend_weight: 0.3,
            hot_threshold: 0.2,
        }
    }
}

/// Probability that a draw hits at least 3 numbers of the current top-N pool.
#[derive(Debug, Clone)]
pub struct PoolCoverage {
    pub pool_size: usize,
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct ProbabilityTable {
    pub game: Game,
    pub draws_used: usize,
    pub numbers: Vec<NumberProbability>,
    pub coverage: Vec<PoolCoverage>,
}

impl ProbabilityTable {
    /// The n most probable numbers, ties broken by the smaller number.
    pub fn top_numbers(&self, n: usize) -> Vec<u8> {
        let mut ranked: Vec<&NumberProbability> = self.numbers.iter().collect();
        ranked.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.number.cmp(&b.number))
        });
        ranked.iter().take(n).map(|p| p.number).collect()
    }
}

fn count_occurrences(draws: &[Draw], pool_size: usize) -> Vec<u32> {
    let mut counts = vec![0u32; pool_size];
    for draw in draws {
        for &n in &draw.main_numbers {
            let idx = (n - 1) as usize;
            if idx < pool_size {
                counts[idx] += 1;
            }
        }
    }
    counts
}

/// Beta(1,1) posterior mean of a number's per-draw appearance rate.
fn posterior(hits: u32, trials: usize) -> f64 {
    (1.0 + hits as f64) / (2.0 + trials as f64)
}

/// Uniform table used when there is no history at all. Probabilities are
/// 1/pool_size and the coverage figures are fixed placeholders, not estimates.
pub fn uniform_table(game: Game) -> ProbabilityTable {
    let size = game.pool_size() as usize;
    let uniform = 1.0 / size as f64;
    ProbabilityTable {
        game,
        draws_used: 0,
        numbers: (1..=size as u8)
            .map(|number| NumberProbability {
                number,
                probability: uniform,
                frequency: 0,
                expected: 0.0,
                trend_factor: 1.0,
                deviation: 0.0,
                tag: ProbabilityTag::Normal,
            })
            .collect(),
        coverage: COVERAGE_POOLS
            .iter()
            .zip(FALLBACK_COVERAGE.iter())
            .map(|(&pool_size, &probability)| PoolCoverage {
                pool_size,
                probability,
            })
            .collect(),
    }
}

/// Smoothed per-number occurrence probabilities over a lookback window.
/// `draws` must be most-recent-first, as fetched from the database.
pub fn estimate(game: Game, draws: &[Draw], config: &EstimatorConfig) -> ProbabilityTable {
    let window = if config.window == 0 {
        draws.len()
    } else {
        config.window.min(draws.len())
    };
    if window == 0 {
        return uniform_table(game);
    }

    let size = game.pool_size() as usize;
    let picks = game.pick_count();
    let long = &draws[..window];
    let short = &draws[..config.trend_window.min(window)];

    let long_counts = count_occurrences(long, size);
    let short_counts = count_occurrences(short, size);
    let expected = window as f64 * picks as f64 / size as f64;

    let numbers: Vec<NumberProbability> = (0..size)
        .map(|i| {
            let long_p = posterior(long_counts[i], long.len());
            let short_p = posterior(short_counts[i], short.len());
            let probability =
                (config.long_weight * long_p + config.trend_weight * short_p).clamp(0.0, 1.0);
            let deviation = (long_counts[i] as f64 - expected) / expected;
            let tag = if deviation > config.hot_threshold {
                ProbabilityTag::Hot
            } else if deviation < -config.hot_threshold {
                ProbabilityTag::Cold
            } else {
                ProbabilityTag::Normal
            };
            NumberProbability {
                number: (i + 1) as u8,
                probability,
                frequency: long_counts[i],
                expected,
                trend_factor: short_p / long_p,
                deviation,
                tag,
            }
        })
        .collect();

    let coverage = COVERAGE_POOLS
        .iter()
        .map(|&pool_size| PoolCoverage {
            pool_size,
            probability: hypergeom::tail_at_least(size, pool_size.min(size), picks, 3),
        })
        .collect();

    ProbabilityTable {
        game,
        draws_used: window,
        numbers,
        coverage,
    }
}

/// `estimate` behind a TTL cache, keyed by (game, window, history length), so
/// a command that needs the same table twice computes it once.
pub struct CachedEstimator {
    config: EstimatorConfig,
    cache: TtlCache<(Game, usize, usize), ProbabilityTable>,
}

impl CachedEstimator {
    pub fn new(config: EstimatorConfig, ttl: Duration) -> Self {
        Self {
            config,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn table(&mut self, game: Game, draws: &[Draw]) -> ProbabilityTable {
        let key = (game, self.config.window, draws.len());
        let config = self.config.clone();
        self.cache
            .get_or_insert_with(key, || estimate(game, draws, &config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_test_draws;

    #[test]
    fn test_probabilities_bounded() {
        for game in Game::all() {
            let draws = make_test_draws(game, 80);
            let table = estimate(game, &draws, &EstimatorConfig::default());
            assert_eq!(table.numbers.len(), game.pool_size() as usize);
            for p in &table.numbers {
                assert!(p.probability >= 0.0 && p.probability <= 1.0, "{:?}", p);
            }
            let mass: f64 = table.numbers.iter().map(|p| p.probability).sum();
            assert!(mass.is_finite());
        }
    }

    #[test]
    fn test_uniform_fallback_on_empty_history() {
        let table = estimate(Game::Lotto, &[], &EstimatorConfig::default());
        assert_eq!(table.draws_used, 0);
        let uniform = 1.0 / 52.0;
        for p in &table.numbers {
            assert!((p.probability - uniform).abs() < 1e-12);
            assert_eq!(p.tag, ProbabilityTag::Normal);
        }
        assert!((table.coverage[0].probability - 0.50).abs() < 1e-12);
        assert!((table.coverage[2].probability - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_hot_cold_mutually_exclusive() {
        let draws = make_test_draws(Game::Lotto, 120);
        let table = estimate(Game::Lotto, &draws, &EstimatorConfig::default());
        for p in &table.numbers {
            if p.deviation > 0.2 {
                assert_eq!(p.tag, ProbabilityTag::Hot, "number {}", p.number);
            }
            if p.deviation < -0.2 {
                assert_eq!(p.tag, ProbabilityTag::Cold, "number {}", p.number);
            }
            if p.tag == ProbabilityTag::Hot {
                assert!(p.deviation > 0.2);
            }
            if p.tag == ProbabilityTag::Cold {
                assert!(p.deviation < -0.2);
            }
        }
    }

    #[test]
    fn test_frequent_number_ranks_higher() {
        // make_test_draws cycles through ten fixed patterns, so some numbers
        // never appear; any recurring number must outrank an absent one.
        let draws = make_test_draws(Game::DailyLotto, 50);
        let table = estimate(Game::DailyLotto, &draws, &EstimatorConfig::default());
        let seen = table.numbers.iter().find(|p| p.frequency > 0).unwrap();
        let unseen = table.numbers.iter().find(|p| p.frequency == 0).unwrap();
        assert!(seen.probability > unseen.probability);
    }

    #[test]
    fn test_coverage_monotone_in_pool_size() {
        let draws = make_test_draws(Game::Lotto, 60);
        let table = estimate(Game::Lotto, &draws, &EstimatorConfig::default());
        for pair in table.coverage.windows(2) {
            assert!(pair[1].probability >= pair[0].probability);
        }
    }

    #[test]
    fn test_top_numbers_count_and_range() {
        let draws = make_test_draws(Game::Powerball, 40);
        let table = estimate(Game::Powerball, &draws, &EstimatorConfig::default());
        let top = table.top_numbers(20);
        assert_eq!(top.len(), 20);
        let mut unique = top.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 20);
        assert!(top.iter().all(|&n| (1..=50).contains(&n)));
    }

    #[test]
    fn test_cached_estimator_reuses_table() {
        let draws = make_test_draws(Game::Lotto, 30);
        let mut cached = CachedEstimator::new(
            EstimatorConfig::default(),
            std::time::Duration::from_secs(60),
        );
        let first = cached.table(Game::Lotto, &draws);
        let second = cached.table(Game::Lotto, &draws);
        assert_eq!(first.draws_used, second.draws_used);
        assert_eq!(
            first.numbers[0].probability.to_bits(),
            second.numbers[0].probability.to_bits()
        );
    }
}
