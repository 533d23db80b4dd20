use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The six South African national lottery games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    Lotto,
    LottoPlus1,
    LottoPlus2,
    Powerball,
    PowerballPlus,
    DailyLotto,
}

impl Game {
    pub fn all() -> [Game; 6] {
        [
            Game::Lotto,
            Game::LottoPlus1,
            Game::LottoPlus2,
            Game::Powerball,
            Game::PowerballPlus,
            Game::DailyLotto,
        ]
    }

    /// Size of the main number pool.
    pub fn pool_size(&self) -> u8 {
        match self {
            Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2 => 52,
            Game::Powerball | Game::PowerballPlus => 50,
            Game::DailyLotto => 36,
        }
    }

    /// How many main numbers are drawn.
    pub fn pick_count(&self) -> usize {
        match self {
            Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2 => 6,
            Game::Powerball | Game::PowerballPlus | Game::DailyLotto => 5,
        }
    }

    /// How many bonus numbers are drawn (0 for Daily Lotto).
    pub fn bonus_count(&self) -> usize {
        match self {
            Game::DailyLotto => 0,
            _ => 1,
        }
    }

    /// Size of the bonus pool. The Lotto family draws its bonus ball from the
    /// remaining main pool; PowerBall uses a separate 1-20 machine.
    pub fn bonus_pool_size(&self) -> u8 {
        match self {
            Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2 => 52,
            Game::Powerball | Game::PowerballPlus => 20,
            Game::DailyLotto => 0,
        }
    }

    pub fn bonus_shares_main_pool(&self) -> bool {
        matches!(self, Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2)
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Game::Lotto => "lotto",
            Game::LottoPlus1 => "lotto-plus-1",
            Game::LottoPlus2 => "lotto-plus-2",
            Game::Powerball => "powerball",
            Game::PowerballPlus => "powerball-plus",
            Game::DailyLotto => "daily-lotto",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Game::Lotto => "LOTTO",
            Game::LottoPlus1 => "LOTTO PLUS 1",
            Game::LottoPlus2 => "LOTTO PLUS 2",
            Game::Powerball => "POWERBALL",
            Game::PowerballPlus => "POWERBALL PLUS",
            Game::DailyLotto => "DAILY LOTTO",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        let game = match normalized.as_str() {
            "lotto" => Game::Lotto,
            "lotto-plus-1" | "lotto-plus1" => Game::LottoPlus1,
            "lotto-plus-2" | "lotto-plus2" => Game::LottoPlus2,
            "powerball" => Game::Powerball,
            "powerball-plus" => Game::PowerballPlus,
            "daily-lotto" => Game::DailyLotto,
            _ => bail!("Unknown game: '{}'", s),
        };
        Ok(game)
    }
}

/// Winner count and payout for one prize division of a draw, as published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DivisionResult {
    pub division: u8,
    pub winners: u32,
    pub payout: String,
}

/// One real lottery drawing. Exactly one row per (game, draw_number).
#[derive(Debug, Clone)]
pub struct Draw {
    pub game: Game,
    pub draw_number: u32,
    /// ISO-8601 date string (YYYY-MM-DD).
    pub draw_date: String,
    /// Sorted, unique main numbers.
    pub main_numbers: Vec<u8>,
    /// Empty for Daily Lotto.
    pub bonus_numbers: Vec<u8>,
    pub divisions: Vec<DivisionResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbabilityTag {
    Hot,
    Cold,
    Normal,
}

impl std::fmt::Display for ProbabilityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbabilityTag::Hot => write!(f, "HOT"),
            ProbabilityTag::Cold => write!(f, "COLD"),
            ProbabilityTag::Normal => write!(f, "-"),
        }
    }
}

/// Per-number estimate, recomputed from the draw history on request.
#[derive(Debug, Clone)]
pub struct NumberProbability {
    pub number: u8,
    /// Smoothed occurrence probability per draw, in [0, 1].
    pub probability: f64,
    pub frequency: u32,
    pub expected: f64,
    /// Short-window rate over long-window rate (1.0 = no trend).
    pub trend_factor: f64,
    /// (frequency - expected) / expected.
    pub deviation: f64,
    pub tag: ProbabilityTag,
}

/// One model's proposal for one game. Ephemeral; combined and discarded,
/// except as JSON inside a stored prediction for accuracy attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub model: String,
    pub main_numbers: Vec<u8>,
    pub bonus_numbers: Vec<u8>,
    pub confidence: f64,
    pub reasoning: String,
}

/// The persisted ensemble output, one row per (game, target_draw_date).
#[derive(Debug, Clone)]
pub struct StoredPrediction {
    pub id: i64,
    pub game: Game,
    pub target_draw_date: String,
    pub main_numbers: Vec<u8>,
    pub bonus_numbers: Vec<u8>,
    pub confidence: f64,
    pub reasoning: String,
    pub contributors: Vec<ModelPrediction>,
    pub locked: bool,
    pub main_matches: Option<u32>,
    pub bonus_matches: Option<u32>,
    pub division: Option<String>,
}

pub fn validate_draw(game: Game, main: &[u8], bonus: &[u8]) -> Result<()> {
    if main.len() != game.pick_count() {
        bail!(
            "{} takes {} main numbers, got {}",
            game,
            game.pick_count(),
            main.len()
        );
    }
    if bonus.len() != game.bonus_count() {
        bail!(
            "{} takes {} bonus number(s), got {}",
            game,
            game.bonus_count(),
            bonus.len()
        );
    }
    for &n in main {
        if n < 1 || n > game.pool_size() {
            bail!("Main number {} out of range (1-{})", n, game.pool_size());
        }
    }
    for &b in bonus {
        if b < 1 || b > game.bonus_pool_size() {
            bail!(
                "Bonus number {} out of range (1-{})",
                b,
                game.bonus_pool_size()
            );
        }
    }
    for i in 0..main.len() {
        for j in (i + 1)..main.len() {
            if main[i] == main[j] {
                bail!("Duplicate main number: {}", main[i]);
            }
        }
    }
    if game.bonus_shares_main_pool() {
        for &b in bonus {
            if main.contains(&b) {
                bail!("Bonus ball {} repeats a main number", b);
            }
        }
    }
    Ok(())
}
