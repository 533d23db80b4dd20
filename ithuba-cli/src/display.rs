use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use ithuba_db::models::{Draw, ProbabilityTag, StoredPrediction};
use ithuba_engine::backtest::BacktestReport;
use ithuba_engine::divisions::ticket_price;
use ithuba_engine::ensemble::EnsemblePrediction;
use ithuba_engine::estimator::ProbabilityTable;
use ithuba_engine::wheel::WheelPlan;

use crate::import::ImportResult;

fn numbers_str(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("No draws to display.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Game", "Draw", "Date", "Main numbers", "Bonus"]);

    for draw in draws {
        let bonus = if draw.bonus_numbers.is_empty() {
            "—".to_string()
        } else {
            numbers_str(&draw.bonus_numbers)
        };
        table.add_row(vec![
            &draw.game.to_string(),
            &draw.draw_number.to_string(),
            &draw.draw_date,
            &numbers_str(&draw.main_numbers),
            &bonus,
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import complete:");
    println!("  Records read       : {}", result.total_records);
    println!("  Inserted           : {}", result.inserted);
    println!("  Duplicates skipped : {}", result.skipped);
    if result.errors > 0 {
        println!("  Errors             : {}", result.errors);
    }
}

pub fn display_probabilities(table: &ProbabilityTable) {
    println!(
        "\n📊 Number probabilities for {} ({} draws analysed)\n",
        table.game, table.draws_used
    );

    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Number",
            "Probability",
            "Frequency",
            "Expected",
            "Trend",
            "Deviation",
            "Tag",
        ]);

    let mut sorted = table.numbers.clone();
    sorted.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for prob in &sorted {
        let color = match prob.tag {
            ProbabilityTag::Hot => Color::Green,
            ProbabilityTag::Cold => Color::Red,
            ProbabilityTag::Normal => Color::White,
        };
        out.add_row(vec![
            Cell::new(format!("{:2}", prob.number)),
            Cell::new(format!("{:.4}", prob.probability)),
            Cell::new(prob.frequency.to_string()),
            Cell::new(format!("{:.1}", prob.expected)),
            Cell::new(format!("{:.2}", prob.trend_factor)),
            Cell::new(format!("{:+.0}%", prob.deviation * 100.0)),
            Cell::new(prob.tag.to_string()).fg(color),
        ]);
    }
    println!("{out}");

    println!("\nPool coverage (chance the draw hits ≥3 of the top pool):");
    for coverage in &table.coverage {
        println!(
            "  Top {:2} numbers : {:.1}%",
            coverage.pool_size,
            coverage.probability * 100.0
        );
    }
}

pub fn display_prediction(prediction: &EnsemblePrediction) {
    println!("\n🎯 Ensemble prediction for {}\n", prediction.game);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Main numbers", "Bonus", "Confidence"]);
    let bonus = if prediction.bonus_numbers.is_empty() {
        "—".to_string()
    } else {
        numbers_str(&prediction.bonus_numbers)
    };
    table.add_row(vec![
        &numbers_str(&prediction.main_numbers),
        &bonus,
        &format!("{:.0}%", prediction.confidence * 100.0),
    ]);
    println!("{table}");

    let mut votes = Table::new();
    votes
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Number", "Vote weight"]);
    for (number, weight) in prediction.votes.iter().take(10) {
        votes.add_row(vec![format!("{:2}", number), format!("{:.3}", weight)]);
    }
    println!("{votes}");

    let mut contributors = Table::new();
    contributors
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Model", "Numbers", "Confidence", "Reasoning"]);
    for model in &prediction.contributors {
        contributors.add_row(vec![
            &model.model,
            &numbers_str(&model.main_numbers),
            &format!("{:.0}%", model.confidence * 100.0),
            &model.reasoning,
        ]);
    }
    println!("{contributors}");

    if prediction.dropped > 0 {
        println!(
            "⚠ {} model(s) failed or timed out; prediction built from {} model(s).",
            prediction.dropped,
            prediction.contributors.len()
        );
    }
    println!("{}", prediction.reasoning);
}

pub fn display_stored_prediction(stored: &StoredPrediction) {
    println!(
        "\nStored prediction for {} on {} ({})",
        stored.game,
        stored.target_draw_date,
        if stored.locked { "validated" } else { "pending" }
    );
    println!("  Main numbers : {}", numbers_str(&stored.main_numbers));
    if !stored.bonus_numbers.is_empty() {
        println!("  Bonus        : {}", numbers_str(&stored.bonus_numbers));
    }
    println!("  Confidence   : {:.0}%", stored.confidence * 100.0);
    if let (Some(mm), Some(bm)) = (stored.main_matches, stored.bonus_matches) {
        println!("  Result       : {} main + {} bonus matches", mm, bm);
        match &stored.division {
            Some(d) => println!("  Division     : {}", d),
            None => println!("  Division     : no prize"),
        }
    }
}

pub fn display_wheel(plan: &WheelPlan) {
    println!(
        "\n🎡 Wheel for {} — pool of {} numbers, ≥3-match pool coverage {:.1}%\n",
        plan.game,
        plan.pool.len(),
        plan.pool_coverage * 100.0
    );
    println!("Pool: {}", numbers_str(&plan.pool));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Line", "New triples covered"]);
    for (i, line) in plan.lines.iter().enumerate() {
        table.add_row(vec![
            format!("{}", i + 1),
            numbers_str(&line.numbers),
            line.new_triples.to_string(),
        ]);
    }
    println!("{table}");

    println!(
        "Triple coverage: {}/{} ({:.1}%) with {} lines at R{:.2} each (R{:.2} total)",
        plan.covered_triples,
        plan.total_triples,
        plan.coverage_fraction() * 100.0,
        plan.lines.len(),
        ticket_price(plan.game),
        ticket_price(plan.game) * plan.lines.len() as f64,
    );
}

pub fn display_backtest(report: &BacktestReport) {
    println!(
        "\n📈 Backtest: {} strategy on {} ({} draws replayed)\n",
        report.strategy, report.game, report.draws_tested
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Main matches", "Draws", "Share"]);
    for (matches, &count) in report.match_histogram.iter().enumerate() {
        table.add_row(vec![
            matches.to_string(),
            count.to_string(),
            format!("{:.1}%", 100.0 * count as f64 / report.draws_tested as f64),
        ]);
    }
    println!("{table}");

    if !report.division_counts.is_empty() {
        let mut divisions = Table::new();
        divisions
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Division", "Hits"]);
        for (name, count) in &report.division_counts {
            divisions.add_row(vec![name.clone(), count.to_string()]);
        }
        println!("{divisions}");
    }

    println!(
        "Mean main matches : {:.3} (uniform random expectation {:.3})",
        report.mean_main_matches, report.expected_random_matches
    );
    println!("Bonus hits        : {}", report.bonus_hits);
    println!(
        "Simulated spend   : R{:.2}, winnings R{:.2}, ROI {:+.1}%",
        report.total_spend,
        report.total_winnings,
        report.roi * 100.0
    );
}
