use std::path::Path;

use anyhow::{Context, Result};
use ithuba_db::rusqlite::Connection;

use ithuba_db::db::insert_draw;
use ithuba_db::models::{validate_draw, Draw, Game};

/// Expected columns: game, draw_number, draw_date, main_numbers, bonus_numbers.
/// Number columns are space-separated; bonus_numbers may be empty.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Missing field at index {}", idx))
    };

    let game: Game = get(0)?.parse()?;
    let raw_number = get(1)?;
    let draw_number: u32 = raw_number
        .parse()
        .with_context(|| format!("Invalid draw number '{}'", raw_number))?;
    let draw_date = parse_date(&get(2)?)?;
    let main_numbers = parse_numbers(&get(3)?)?;
    let bonus_numbers = parse_numbers(&get(4).unwrap_or_default())?;

    validate_draw(game, &main_numbers, &bonus_numbers)?;

    Ok(Draw {
        game,
        draw_number,
        draw_date,
        main_numbers,
        bonus_numbers,
        divisions: Vec::new(),
    })
}

pub fn parse_numbers(s: &str) -> Result<Vec<u8>> {
    let mut numbers = s
        .split_whitespace()
        .map(|n| {
            n.parse::<u8>()
                .with_context(|| format!("Invalid number '{}'", n))
        })
        .collect::<Result<Vec<u8>>>()?;
    numbers.sort();
    Ok(numbers)
}

/// Accepts YYYY-MM-DD as-is and DD/MM/YYYY from operator exports.
fn parse_date(raw: &str) -> Result<String> {
    if raw.contains('/') {
        let date = chrono::NaiveDate::parse_from_str(raw, "%d/%m/%Y")
            .with_context(|| format!("Invalid date '{}'", raw))?;
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'", raw))?;
    Ok(raw.to_string())
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;

    let tx = conn
        .unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => match parse_record(&record) {
                Ok(draw) => match insert_draw(&tx, &draw) {
                    Ok(true) => result.inserted += 1,
                    Ok(false) => result.skipped += 1,
                    Err(e) => {
                        eprintln!("Insert error at line {}: {}", result.total_records, e);
                        result.errors += 1;
                    }
                },
                Err(e) => {
                    eprintln!("Parse error at line {}: {}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                eprintln!("Read error at line {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers_sorts() {
        assert_eq!(parse_numbers("34 2 51 7 19 40").unwrap(), vec![2, 7, 19, 34, 40, 51]);
        assert_eq!(parse_numbers("").unwrap(), Vec::<u8>::new());
        assert!(parse_numbers("3 x 9").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-08-29").unwrap(), "2026-08-29");
        assert_eq!(parse_date("29/08/2026").unwrap(), "2026-08-29");
        assert!(parse_date("2026-13-01").is_err());
        assert!(parse_date("29-08-2026").is_err());
    }

    #[test]
    fn test_parse_record() {
        let record = csv::StringRecord::from(vec![
            "lotto",
            "2501",
            "2026-08-26",
            "5 12 23 34 45 51",
            "9",
        ]);
        let draw = parse_record(&record).unwrap();
        assert_eq!(draw.game, Game::Lotto);
        assert_eq!(draw.draw_number, 2501);
        assert_eq!(draw.main_numbers, vec![5, 12, 23, 34, 45, 51]);
        assert_eq!(draw.bonus_numbers, vec![9]);
    }

    #[test]
    fn test_parse_record_rejects_bad_geometry() {
        let record = csv::StringRecord::from(vec![
            "daily-lotto",
            "900",
            "2026-08-26",
            "1 2 3 4 5",
            "6",
        ]);
        assert!(parse_record(&record).is_err());
    }
}
