use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::models::{Draw, Game, ModelPrediction, StoredPrediction};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    id            INTEGER PRIMARY KEY,
    game          TEXT NOT NULL,
    draw_number   INTEGER NOT NULL,
    draw_date     TEXT NOT NULL,
    main_numbers  TEXT NOT NULL,
    bonus_numbers TEXT NOT NULL DEFAULT '',
    divisions     TEXT NOT NULL DEFAULT '[]',
    UNIQUE (game, draw_number)
);

CREATE TABLE IF NOT EXISTS predictions (
    id               INTEGER PRIMARY KEY,
    game             TEXT NOT NULL,
    target_draw_date TEXT NOT NULL,
    main_numbers     TEXT NOT NULL,
    bonus_numbers    TEXT NOT NULL DEFAULT '',
    confidence       REAL NOT NULL DEFAULT 0.0,
    reasoning        TEXT NOT NULL DEFAULT '',
    contributors     TEXT NOT NULL DEFAULT '[]',
    locked           INTEGER NOT NULL DEFAULT 0,
    main_matches     INTEGER,
    bonus_matches    INTEGER,
    division         TEXT,
    UNIQUE (game, target_draw_date)
);

CREATE TABLE IF NOT EXISTS model_accuracy (
    model         TEXT NOT NULL,
    game          TEXT NOT NULL,
    predictions   INTEGER NOT NULL DEFAULT 0,
    hits          INTEGER NOT NULL DEFAULT 0,
    opportunities INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (model, game)
);
";

pub fn db_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("ITHUBA_DB") {
        return std::path::PathBuf::from(path);
    }
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("ithuba.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).context("Migration failed")?;
    Ok(())
}

pub fn numbers_to_text(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn numbers_from_text(text: &str) -> Result<Vec<u8>> {
    text.split_whitespace()
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Cannot parse number '{}'", s))
        })
        .collect()
}

/// Inserts a draw, ignoring duplicates of (game, draw_number).
/// Returns true if a row was actually written.
pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let divisions =
        serde_json::to_string(&draw.divisions).context("Cannot serialize divisions")?;
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO draws (game, draw_number, draw_date, main_numbers, bonus_numbers, divisions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                draw.game.slug(),
                draw.draw_number,
                draw.draw_date,
                numbers_to_text(&draw.main_numbers),
                numbers_to_text(&draw.bonus_numbers),
                divisions,
            ],
        )
        .context("Draw insert failed")?;
    Ok(changed > 0)
}

pub fn count_draws(conn: &Connection, game: Game) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM draws WHERE game = ?1",
        [game.slug()],
        |row| row.get(0),
    )?;
    Ok(count)
}

type DrawRow = (u32, String, String, String, String);

fn draw_from_row(game: Game, row: DrawRow) -> Result<Draw> {
    let (draw_number, draw_date, main, bonus, divisions) = row;
    Ok(Draw {
        game,
        draw_number,
        draw_date,
        main_numbers: numbers_from_text(&main)?,
        bonus_numbers: numbers_from_text(&bonus)?,
        divisions: serde_json::from_str(&divisions).context("Cannot parse divisions column")?,
    })
}

/// Most recent draws first.
pub fn fetch_last_draws(conn: &Connection, game: Game, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_number, draw_date, main_numbers, bonus_numbers, divisions
         FROM draws WHERE game = ?1
         ORDER BY draw_date DESC, draw_number DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![game.slug(), limit], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<Result<Vec<DrawRow>, _>>()?;
    rows.into_iter().map(|r| draw_from_row(game, r)).collect()
}

/// Full history, oldest first. Used by the backtester.
pub fn fetch_draws_ascending(conn: &Connection, game: Game) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_number, draw_date, main_numbers, bonus_numbers, divisions
         FROM draws WHERE game = ?1
         ORDER BY draw_date ASC, draw_number ASC",
    )?;
    let rows = stmt
        .query_map([game.slug()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<Result<Vec<DrawRow>, _>>()?;
    rows.into_iter().map(|r| draw_from_row(game, r)).collect()
}

pub fn latest_draw(conn: &Connection, game: Game) -> Result<Option<Draw>> {
    Ok(fetch_last_draws(conn, game, 1)?.into_iter().next())
}

/// Pending (unvalidated) ensemble output to persist.
pub struct NewPrediction<'a> {
    pub game: Game,
    pub target_draw_date: &'a str,
    pub main_numbers: &'a [u8],
    pub bonus_numbers: &'a [u8],
    pub confidence: f64,
    pub reasoning: &'a str,
    pub contributors: &'a [ModelPrediction],
}

/// Insert-or-update on (game, target_draw_date). A locked row (one already
/// validated against a real draw) is never overwritten; returns false then.
pub fn upsert_prediction(conn: &Connection, p: &NewPrediction) -> Result<bool> {
    let contributors =
        serde_json::to_string(p.contributors).context("Cannot serialize contributors")?;
    let changed = conn
        .execute(
            "INSERT INTO predictions (game, target_draw_date, main_numbers, bonus_numbers, confidence, reasoning, contributors)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(game, target_draw_date) DO UPDATE SET
                 main_numbers = excluded.main_numbers,
                 bonus_numbers = excluded.bonus_numbers,
                 confidence = excluded.confidence,
                 reasoning = excluded.reasoning,
                 contributors = excluded.contributors,
                 main_matches = NULL,
                 bonus_matches = NULL,
                 division = NULL
             WHERE locked = 0",
            rusqlite::params![
                p.game.slug(),
                p.target_draw_date,
                numbers_to_text(p.main_numbers),
                numbers_to_text(p.bonus_numbers),
                p.confidence,
                p.reasoning,
                contributors,
            ],
        )
        .context("Prediction upsert failed")?;
    Ok(changed > 0)
}

pub fn fetch_prediction(
    conn: &Connection,
    game: Game,
    target_draw_date: &str,
) -> Result<Option<StoredPrediction>> {
    let row: Option<(i64, String, String, f64, String, String, bool, Option<u32>, Option<u32>, Option<String>)> =
        conn.query_row(
            "SELECT id, main_numbers, bonus_numbers, confidence, reasoning, contributors,
                    locked, main_matches, bonus_matches, division
             FROM predictions WHERE game = ?1 AND target_draw_date = ?2",
            rusqlite::params![game.slug(), target_draw_date],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            },
        )
        .optional()?;

    let Some((id, main, bonus, confidence, reasoning, contributors, locked, mm, bm, division)) =
        row
    else {
        return Ok(None);
    };
    Ok(Some(StoredPrediction {
        id,
        game,
        target_draw_date: target_draw_date.to_string(),
        main_numbers: numbers_from_text(&main)?,
        bonus_numbers: numbers_from_text(&bonus)?,
        confidence,
        reasoning,
        contributors: serde_json::from_str(&contributors)
            .context("Cannot parse contributors column")?,
        locked,
        main_matches: mm,
        bonus_matches: bm,
        division,
    }))
}

/// Writes hindsight match counts against the real draw and locks the row.
pub fn record_validation(
    conn: &Connection,
    prediction_id: i64,
    main_matches: u32,
    bonus_matches: u32,
    division: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE predictions
         SET main_matches = ?2, bonus_matches = ?3, division = ?4, locked = 1
         WHERE id = ?1",
        rusqlite::params![prediction_id, main_matches, bonus_matches, division],
    )
    .context("Validation update failed")?;
    Ok(())
}

/// Running per-model hit ledger: `hits` predicted numbers landed out of
/// `opportunities` predicted across `predictions` validated draws.
pub fn bump_model_accuracy(
    conn: &Connection,
    model: &str,
    game: Game,
    hits: u32,
    opportunities: u32,
) -> Result<()> {
    conn.execute(
        "INSERT INTO model_accuracy (model, game, predictions, hits, opportunities)
         VALUES (?1, ?2, 1, ?3, ?4)
         ON CONFLICT(model, game) DO UPDATE SET
             predictions = predictions + 1,
             hits = hits + excluded.hits,
             opportunities = opportunities + excluded.opportunities",
        rusqlite::params![model, game.slug(), hits, opportunities],
    )
    .context("Accuracy update failed")?;
    Ok(())
}

/// Normalized accuracy shares per model for one game. Empty when no history
/// exists; the ensemble falls back to equal weights in that case.
pub fn fetch_model_weights(conn: &Connection, game: Game) -> Result<HashMap<String, f64>> {
    let mut stmt = conn.prepare(
        "SELECT model, hits, opportunities FROM model_accuracy WHERE game = ?1",
    )?;
    let rows = stmt
        .query_map([game.slug()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?, row.get::<_, u32>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let accuracies: Vec<(String, f64)> = rows
        .into_iter()
        .filter(|(_, _, opp)| *opp > 0)
        .map(|(model, hits, opp)| (model, hits as f64 / opp as f64))
        .collect();
    let total: f64 = accuracies.iter().map(|(_, a)| a).sum();
    if total <= 0.0 {
        return Ok(HashMap::new());
    }
    Ok(accuracies
        .into_iter()
        .map(|(model, a)| (model, a / total))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(game: Game, number: u32, date: &str) -> Draw {
        let (main, bonus): (Vec<u8>, Vec<u8>) = match game.pick_count() {
            6 => (vec![1, 2, 3, 4, 5, 6], vec![7]),
            _ => (vec![1, 2, 3, 4, 5], if game.bonus_count() > 0 { vec![8] } else { vec![] }),
        };
        Draw {
            game,
            draw_number: number,
            draw_date: date.to_string(),
            main_numbers: main,
            bonus_numbers: bonus,
            divisions: vec![],
        }
    }

    fn new_prediction(game: Game) -> NewPrediction<'static> {
        NewPrediction {
            game,
            target_draw_date: "2025-06-04",
            main_numbers: &[3, 11, 19, 27, 40, 51],
            bonus_numbers: &[14],
            confidence: 0.42,
            reasoning: "test",
            contributors: &[],
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn, Game::Lotto).unwrap(), 0);
        insert_draw(&conn, &test_draw(Game::Lotto, 2501, "2025-01-01")).unwrap();
        assert_eq!(count_draws(&conn, Game::Lotto).unwrap(), 1);
        // Counts are per game.
        assert_eq!(count_draws(&conn, Game::Powerball).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_draw_ignored() {
        let conn = memory_db();
        assert!(insert_draw(&conn, &test_draw(Game::Lotto, 2501, "2025-01-01")).unwrap());
        assert!(!insert_draw(&conn, &test_draw(Game::Lotto, 2501, "2025-01-01")).unwrap());
        assert_eq!(count_draws(&conn, Game::Lotto).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();
        insert_draw(&conn, &test_draw(Game::Lotto, 2501, "2025-01-01")).unwrap();
        insert_draw(&conn, &test_draw(Game::Lotto, 2503, "2025-01-08")).unwrap();
        insert_draw(&conn, &test_draw(Game::Lotto, 2502, "2025-01-04")).unwrap();

        let draws = fetch_last_draws(&conn, Game::Lotto, 10).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].draw_number, 2503);
        assert_eq!(draws[2].draw_number, 2501);

        let ascending = fetch_draws_ascending(&conn, Game::Lotto).unwrap();
        assert_eq!(ascending[0].draw_number, 2501);
        assert_eq!(ascending[2].draw_number, 2503);
    }

    #[test]
    fn test_numbers_roundtrip() {
        let numbers = vec![1u8, 17, 52];
        assert_eq!(numbers_from_text(&numbers_to_text(&numbers)).unwrap(), numbers);
        assert!(numbers_from_text("1 x 3").is_err());
        assert!(numbers_from_text("").unwrap().is_empty());
    }

    #[test]
    fn test_prediction_upsert_updates_in_place() {
        let conn = memory_db();
        assert!(upsert_prediction(&conn, &new_prediction(Game::Lotto)).unwrap());

        let mut second = new_prediction(Game::Lotto);
        second.main_numbers = &[2, 9, 16, 23, 30, 44];
        second.confidence = 0.5;
        assert!(upsert_prediction(&conn, &second).unwrap());

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let stored = fetch_prediction(&conn, Game::Lotto, "2025-06-04")
            .unwrap()
            .unwrap();
        assert_eq!(stored.main_numbers, vec![2, 9, 16, 23, 30, 44]);
        assert!((stored.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_locked_prediction_not_overwritten() {
        let conn = memory_db();
        upsert_prediction(&conn, &new_prediction(Game::Lotto)).unwrap();
        let stored = fetch_prediction(&conn, Game::Lotto, "2025-06-04")
            .unwrap()
            .unwrap();
        record_validation(&conn, stored.id, 3, 0, Some("Division 7")).unwrap();

        let mut second = new_prediction(Game::Lotto);
        second.main_numbers = &[2, 9, 16, 23, 30, 44];
        assert!(!upsert_prediction(&conn, &second).unwrap());

        let after = fetch_prediction(&conn, Game::Lotto, "2025-06-04")
            .unwrap()
            .unwrap();
        assert_eq!(after.main_numbers, vec![3, 11, 19, 27, 40, 51]);
        assert!(after.locked);
        assert_eq!(after.main_matches, Some(3));
        assert_eq!(after.division.as_deref(), Some("Division 7"));
    }

    #[test]
    fn test_model_weights_normalized() {
        let conn = memory_db();
        assert!(fetch_model_weights(&conn, Game::Lotto).unwrap().is_empty());

        bump_model_accuracy(&conn, "frequency", Game::Lotto, 3, 6).unwrap();
        bump_model_accuracy(&conn, "anomaly", Game::Lotto, 1, 6).unwrap();

        let weights = fetch_model_weights(&conn, Game::Lotto).unwrap();
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(weights["frequency"] > weights["anomaly"]);
        // Accuracy in another game does not leak.
        assert!(fetch_model_weights(&conn, Game::Powerball).unwrap().is_empty());
    }
}
