//! Canonical prize divisions per game family, from the official game rules.
//! The payout figures are fixed mid-range estimates used only by the
//! backtester's simulated ROI; real payouts vary per draw.

use ithuba_db::models::{Draw, Game};

#[derive(Debug, Clone, PartialEq)]
pub struct Division {
    pub name: &'static str,
    /// Exact main-number matches required.
    pub main: u8,
    /// Whether the bonus / PowerBall must also be matched.
    pub requires_bonus: bool,
    /// Fixed payout estimate in rand, for simulated ROI.
    pub prize_estimate: f64,
}

const fn div(name: &'static str, main: u8, requires_bonus: bool, prize_estimate: f64) -> Division {
    Division {
        name,
        main,
        requires_bonus,
        prize_estimate,
    }
}

/// LOTTO / LOTTO PLUS 1 / LOTTO PLUS 2: 6/52 with a same-pool bonus ball.
const LOTTO_DIVISIONS: [Division; 8] = [
    div("Division 1", 6, false, 5_000_000.0),
    div("Division 2", 5, true, 120_000.0),
    div("Division 3", 5, false, 6_500.0),
    div("Division 4", 4, true, 2_200.0),
    div("Division 5", 4, false, 250.0),
    div("Division 6", 3, true, 120.0),
    div("Division 7", 3, false, 50.0),
    div("Division 8", 2, true, 20.0),
];

/// POWERBALL / POWERBALL PLUS: 5/50 plus a separate 1-20 PowerBall.
const POWERBALL_DIVISIONS: [Division; 9] = [
    div("Division 1", 5, true, 15_000_000.0),
    div("Division 2", 5, false, 250_000.0),
    div("Division 3", 4, true, 25_000.0),
    div("Division 4", 4, false, 1_200.0),
    div("Division 5", 3, true, 500.0),
    div("Division 6", 3, false, 25.0),
    div("Division 7", 2, true, 22.0),
    div("Division 8", 1, true, 15.0),
    div("Division 9", 0, true, 10.0),
];

/// DAILY LOTTO: 5/36, no bonus ball.
const DAILY_DIVISIONS: [Division; 4] = [
    div("Division 1", 5, false, 350_000.0),
    div("Division 2", 4, false, 350.0),
    div("Division 3", 3, false, 25.0),
    div("Division 4", 2, false, 6.0),
];

pub fn divisions_for_game(game: Game) -> &'static [Division] {
    match game {
        Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2 => &LOTTO_DIVISIONS,
        Game::Powerball | Game::PowerballPlus => &POWERBALL_DIVISIONS,
        Game::DailyLotto => &DAILY_DIVISIONS,
    }
}

pub fn ticket_price(game: Game) -> f64 {
    match game {
        Game::Lotto | Game::LottoPlus1 | Game::LottoPlus2 => 5.0,
        Game::Powerball | Game::PowerballPlus => 7.5,
        Game::DailyLotto => 3.0,
    }
}

/// The highest division a (main_matches, bonus_matches) result qualifies for.
pub fn division_for(game: Game, main_matches: u32, bonus_matches: u32) -> Option<&'static Division> {
    divisions_for_game(game).iter().find(|d| {
        main_matches == d.main as u32 && (!d.requires_bonus || bonus_matches >= 1)
    })
}

pub fn match_counts(
    predicted_main: &[u8],
    predicted_bonus: &[u8],
    actual_main: &[u8],
    actual_bonus: &[u8],
) -> (u32, u32) {
    let main = predicted_main
        .iter()
        .filter(|n| actual_main.contains(n))
        .count() as u32;
    let bonus = predicted_bonus
        .iter()
        .filter(|n| actual_bonus.contains(n))
        .count() as u32;
    (main, bonus)
}

/// Scores a predicted ticket against the real draw.
pub fn score_prediction(
    predicted_main: &[u8],
    predicted_bonus: &[u8],
    actual: &Draw,
) -> (u32, u32, Option<&'static Division>) {
    let (main, bonus) = match_counts(
        predicted_main,
        predicted_bonus,
        &actual.main_numbers,
        &actual.bonus_numbers,
    );
    (main, bonus, division_for(actual.game, main, bonus))
}
