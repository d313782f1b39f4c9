use super::Result;
use colored::Colorize;
use std::fs;
use std::path::Path;
use stv_count::report::parser::parse_trace;
use stv_count::report::trace::Trace;
use stv_count::report::{CountReport, TraceSummary};

fn load_trace(path: &Path) -> Result<Trace> {
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        let report: CountReport = serde_json::from_str(&text)?;
        Ok(report.trace)
    } else {
        Ok(parse_trace(&text)?)
    }
}

/// Summarises a trace file or the trace inside a JSON report.
pub fn inspect(path: &Path) -> Result<()> {
    let trace = load_trace(path)?;
    let summary = TraceSummary::from_trace(&trace);

    println!("🔍 {}", path.display().to_string().cyan());
    if let Some(seed) = summary.seed {
        println!("   Seed: {:x}", seed);
    }
    if let Some(threshold) = summary.threshold {
        println!("   Threshold: {}", threshold.to_string().bright_yellow());
    }
    println!("   Rounds: {}", summary.rounds);

    println!("   Elected:");
    for entry in &summary.elected {
        println!("     {} {} ({})", "+".green(), entry.name.bold(), entry.votes);
    }
    if !summary.eliminated.is_empty() {
        println!(
            "   Eliminated: {}",
            summary
                .eliminated
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if !summary.removed_by_quota.is_empty() {
        println!("   Removed by quota: {}", summary.removed_by_quota.join(", "));
    }
    if !summary.reinstated.is_empty() {
        println!("   Reinstated: {}", summary.reinstated.join(", "));
    }
    if summary.round_robin {
        println!("   {}", "Round robin allocation used".bright_magenta());
    }
    println!(
        "   Transfers: {}, random choices: {}",
        summary.transfers, summary.random_choices
    );
    for comment in &summary.comments {
        println!("   {} {}", "?".yellow(), comment);
    }

    let counts = TraceSummary::tag_counts(&trace)
        .into_iter()
        .map(|(tag, n)| format!("{} {}", tag, n))
        .collect::<Vec<_>>()
        .join(", ");
    println!("   Records: {}", counts.dimmed());
    Ok(())
}
