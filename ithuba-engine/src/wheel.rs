//! Wheel construction: pick a candidate pool of likely numbers, then cover as
//! many of its 3-subsets as possible with a small budget of ticket lines,
//! greedily. Pools top out at 28 numbers so brute enumeration of every
//! C(pool, picks) candidate line is fine.

use anyhow::{bail, Result};
use ithuba_db::models::Game;

use crate::estimator::ProbabilityTable;
use crate::hypergeom;

/// Pool sizes tried against the coverage target, smallest first.
const CANDIDATE_POOL_SIZES: [usize; 6] = [15, 18, 20, 22, 25, 28];

#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// Maximum number of lines to buy.
    pub budget: usize,
    /// Desired probability that the winning draw hits ≥3 pool numbers.
    pub target_coverage: f64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            budget: 10,
            target_coverage: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WheelLine {
    pub numbers: Vec<u8>,
    /// 3-subsets of the pool this line covered first.
    pub new_triples: usize,
}

#[derive(Debug, Clone)]
pub struct WheelPlan {
    pub game: Game,
    pub pool: Vec<u8>,
    /// Hypergeometric probability that the real draw intersects the pool in
    /// at least 3 places.
    pub pool_coverage: f64,
    pub lines: Vec<WheelLine>,
    pub covered_triples: usize,
    pub total_triples: usize,
}

impl WheelPlan {
    pub fn coverage_fraction(&self) -> f64 {
        if self.total_triples == 0 {
            return 0.0;
        }
        self.covered_triples as f64 / self.total_triples as f64
    }
}

/// Smallest candidate pool size whose ≥3-match probability meets the target;
/// the largest candidate when none does.
pub fn choose_pool_size(game: Game, target_coverage: f64) -> usize {
    let total = game.pool_size() as usize;
    let picks = game.pick_count();
    for &size in &CANDIDATE_POOL_SIZES {
        if hypergeom::tail_at_least(total, size.min(total), picks, 3) >= target_coverage {
            return size.min(total);
        }
    }
    CANDIDATE_POOL_SIZES[CANDIDATE_POOL_SIZES.len() - 1].min(total)
}

/// All k-subsets of 0..n in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    if k == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        result.push(idx.clone());
        let mut i = k - 1;
        loop {
            if idx[i] < n - k + i {
                break;
            }
            if i == 0 {
                return result;
            }
            i -= 1;
        }
        idx[i] += 1;
        for j in (i + 1)..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Combinatorial rank of the triple a < b < c: C(c,3) + C(b,2) + a.
/// Bijective onto [0, C(pool, 3)).
fn triple_rank(a: usize, b: usize, c: usize) -> usize {
    c * (c - 1) * (c - 2) / 6 + b * (b - 1) / 2 + a
}

/// Greedy set cover of the pool's 3-subsets by picks-sized lines.
pub fn greedy_lines(pool: &[u8], picks: usize, budget: usize) -> (Vec<WheelLine>, usize, usize) {
    let n = pool.len();
    let total_triples = (n * (n - 1) * (n - 2)) / 6;
    let line_indices = combinations(n, picks);
    let triple_positions = combinations(picks, 3);

    let mut covered = vec![false; triple_rank(n.saturating_sub(3), n.saturating_sub(2), n.saturating_sub(1)) + 1];
    let mut covered_count = 0usize;
    let mut lines = Vec::new();

    for _ in 0..budget {
        let mut best: Option<(usize, usize)> = None; // (line index, gain)
        for (li, line) in line_indices.iter().enumerate() {
            let mut gain = 0usize;
            for t in &triple_positions {
                let rank = triple_rank(line[t[0]], line[t[1]], line[t[2]]);
                if !covered[rank] {
                    gain += 1;
                }
            }
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some((li, gain));
            }
        }
        let Some((li, gain)) = best else { break };
        if gain == 0 {
            break;
        }
        let line = &line_indices[li];
        for t in &triple_positions {
            let rank = triple_rank(line[t[0]], line[t[1]], line[t[2]]);
            if !covered[rank] {
                covered[rank] = true;
                covered_count += 1;
            }
        }
        let mut numbers: Vec<u8> = line.iter().map(|&i| pool[i]).collect();
        numbers.sort();
        lines.push(WheelLine {
            numbers,
            new_triples: gain,
        });
    }

    (lines, covered_count, total_triples)
}

/// Builds a wheel plan over the most probable numbers of the table.
pub fn build_wheel(game: Game, table: &ProbabilityTable, config: &WheelConfig) -> Result<WheelPlan> {
    if config.budget == 0 {
        bail!("Line budget must be at least 1");
    }
    let picks = game.pick_count();
    let pool_size = choose_pool_size(game, config.target_coverage);
    let pool = table.top_numbers(pool_size);
    if pool.len() < picks {
        bail!(
            "Pool of {} numbers is smaller than a {}-number line",
            pool.len(),
            picks
        );
    }

    let pool_coverage =
        hypergeom::tail_at_least(game.pool_size() as usize, pool.len(), picks, 3);
    let (lines, covered_triples, total_triples) = greedy_lines(&pool, picks, config.budget);

    Ok(WheelPlan {
        game,
        pool,
        pool_coverage,
        lines,
        covered_triples,
        total_triples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{estimate, EstimatorConfig};
    use crate::models::make_test_draws;

    #[test]
    fn test_combinations_counts() {
        assert_eq!(combinations(6, 3).len(), 20);
        assert_eq!(combinations(5, 5).len(), 1);
        assert_eq!(combinations(4, 6).len(), 0);
        for combo in combinations(7, 3) {
            assert!(combo.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_triple_rank_bijective() {
        let n = 10;
        let mut seen = vec![false; n * (n - 1) * (n - 2) / 6];
        for t in combinations(n, 3) {
            let rank = triple_rank(t[0], t[1], t[2]);
            assert!(rank < seen.len());
            assert!(!seen[rank], "rank collision at {:?}", t);
            seen[rank] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_budget_one_line_is_subset_of_pool() {
        let pool: Vec<u8> = vec![3, 7, 11, 15, 19, 23, 27, 31, 35];
        let (lines, covered, total) = greedy_lines(&pool, 6, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].numbers.len(), 6);
        assert!(lines[0].numbers.iter().all(|n| pool.contains(n)));
        // One 6-number line covers exactly C(6,3) = 20 triples.
        assert_eq!(covered, 20);
        assert_eq!(total, 9 * 8 * 7 / 6);
    }

    #[test]
    fn test_coverage_monotone_in_budget() {
        let pool: Vec<u8> = (1..=12).collect();
        let mut previous = 0;
        for budget in 1..=8 {
            let (_, covered, _) = greedy_lines(&pool, 5, budget);
            assert!(covered >= previous, "coverage dropped at budget {}", budget);
            previous = covered;
        }
    }

    #[test]
    fn test_pool_equal_to_picks_fully_covered_by_one_line() {
        let pool: Vec<u8> = vec![2, 4, 6, 8, 10, 12];
        let (lines, covered, total) = greedy_lines(&pool, 6, 5);
        assert_eq!(lines.len(), 1); // second line would add nothing
        assert_eq!(covered, total);
    }

    #[test]
    fn test_choose_pool_size_from_candidates() {
        for game in Game::all() {
            let size = choose_pool_size(game, 0.9);
            assert!(CANDIDATE_POOL_SIZES.contains(&size));
            // A trivial target is met by the smallest candidate.
            assert_eq!(choose_pool_size(game, 0.0), 15);
        }
    }

    #[test]
    fn test_build_wheel_plan() {
        let game = Game::DailyLotto;
        let draws = make_test_draws(game, 60);
        let table = estimate(game, &draws, &EstimatorConfig::default());
        let plan = build_wheel(
            game,
            &table,
            &WheelConfig {
                budget: 4,
                target_coverage: 0.9,
            },
        )
        .unwrap();

        assert!(!plan.lines.is_empty());
        assert!(plan.lines.len() <= 4);
        for line in &plan.lines {
            assert_eq!(line.numbers.len(), game.pick_count());
            assert!(line.numbers.iter().all(|n| plan.pool.contains(n)));
        }
        assert!(plan.pool_coverage > 0.0 && plan.pool_coverage <= 1.0);
        assert!(plan.coverage_fraction() > 0.0);
        // First greedy pick always covers the most; gains never increase.
        for pair in plan.lines.windows(2) {
            assert!(pair[0].new_triples >= pair[1].new_triples);
        }
    }

    #[test]
    fn test_build_wheel_zero_budget_rejected() {
        let game = Game::Lotto;
        let table = estimate(game, &[], &EstimatorConfig::default());
        let config = WheelConfig {
            budget: 0,
            target_coverage: 0.9,
        };
        assert!(build_wheel(game, &table, &config).is_err());
    }
}
