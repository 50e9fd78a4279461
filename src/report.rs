//! Scenario report output.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use crate::scenario::ScenarioReport;

/// Usage above which a link is listed as hot in the text report
const HOT_LINK_USAGE: f64 = 0.6;

/// Generate JSON report
pub fn generate_json_report(report: &ScenarioReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Render the human-readable text report
pub fn render_text_report(report: &ScenarioReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(80));
    lines.push("                       TRAFFICSIM SCENARIO REPORT".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Generated: {}", report.generated_at));
    lines.push(format!("Topology: {}", report.topology));
    lines.push(format!("Routing Method: {}", report.routing_method));
    lines.push(format!(
        "Nodes: {}, Links: {} ({} on)",
        report.node_count, report.link_count, report.active_links
    ));
    lines.push(String::new());

    lines.push("=".repeat(80));
    lines.push("                               FLOWS".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Admitted: {}", report.admitted.len()));
    lines.push(format!("Rejected: {}", report.rejected.len()));
    for (id, reason) in &report.rejected {
        lines.push(format!("  {}: {}", id, reason));
    }
    lines.push(String::new());

    if !report.paths.is_empty() {
        lines.push("Paths:".to_string());
        for (id, path) in &report.paths {
            lines.push(format!("  {}: {}", id, path.join(" -> ")));
        }
        lines.push(String::new());
    }

    if !report.failed_nodes.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                              FAILURES".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());

        lines.push(format!("Failed nodes: {}", report.failed_nodes.join(", ")));
        lines.push(format!("Disrupted flows: {}", report.disrupted.len()));
        lines.push(format!("  Rerouted: {}", report.rerouted.len()));
        lines.push(format!("  Dropped: {}", report.dropped.len()));
        for (id, reason) in &report.dropped {
            lines.push(format!("    {}: {}", id, reason));
        }
        lines.push(String::new());
    }

    lines.push("=".repeat(80));
    lines.push("                          POWER AND RELIABILITY".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Power consumption: {:.1} W", report.power_consumption));
    lines.push(format!("Max link risk: {:.3}", report.reliability.max_risk));
    lines.push(format!("Mean link risk: {:.3}", report.reliability.mean_risk));
    lines.push(format!(
        "Links above {:.0}% usage: {}",
        HOT_LINK_USAGE * 100.0,
        report.reliability.links_above_threshold
    ));

    let hot: Vec<(&String, &f64)> = report
        .link_usages
        .iter()
        .filter(|&(_, &usage)| usage > HOT_LINK_USAGE)
        .collect();
    if !hot.is_empty() {
        lines.push("Hot links:".to_string());
        for (id, usage) in hot {
            lines.push(format!("  {}: {:.1}%", id, usage * 100.0));
        }
    }
    lines.push(String::new());

    lines.push("=".repeat(80));
    lines.join("\n")
}

/// Generate human-readable text report
pub fn generate_text_report(report: &ScenarioReport, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_text_report(report))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &ScenarioReport) {
    println!("\n=== TRAFFICSIM SCENARIO SUMMARY ===\n");
    println!("Topology: {} ({})", report.topology, report.routing_method);
    println!("Admitted: {}", report.admitted.len());
    println!("Rejected: {}", report.rejected.len());
    if !report.failed_nodes.is_empty() {
        println!(
            "Disrupted: {} (rerouted {}, dropped {})",
            report.disrupted.len(),
            report.rerouted.len(),
            report.dropped.len()
        );
    }
    println!("Power: {:.1} W", report.power_consumption);
    println!("Max link risk: {:.3}", report.reliability.max_risk);
    println!();
}
