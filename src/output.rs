use crate::models::{ProjectResult, ProjectStatus};
use crate::rubric::Rubric;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the ranked judging results in the specified format
pub fn print_results(results: &[ProjectResult], rubric: &Rubric, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(results, rubric),
        OutputFormat::Json => print_json(results),
    }
}

fn print_plain(results: &[ProjectResult], rubric: &Rubric) {
    if results.is_empty() {
        println!("No projects were judged.");
        return;
    }

    println!("=== RANKING ===");
    println!();
    println!("{:<5} {:<25} {:<8} {:<8}", "Rank", "Project", "Total", "Status");
    println!("{}", "-".repeat(50));
    for (index, result) in results.iter().enumerate() {
        println!(
            "{:<5} {:<25} {:<8.2} {:<8}",
            index + 1,
            result.project_name,
            result.total_score,
            status_label(result.status)
        );
    }
    println!();

    println!("=== DETAILED BREAKDOWN ===");
    for (index, result) in results.iter().enumerate() {
        println!();
        println!("{}. {}", index + 1, result.project_name);
        println!("Status: {}", status_label(result.status));
        println!("Total Score: {:.2}", result.total_score);
        println!("Scores & Rationales:");
        for criterion in &rubric.criteria {
            let score = result.scores.get(&criterion.name).copied().unwrap_or(0.0);
            let rationale = result
                .rationales
                .get(&criterion.name)
                .map(String::as_str)
                .unwrap_or("No rationale provided.");
            println!("  • {}: {}/{}", criterion.name, score, rubric.scale.1);
            println!("    {}", rationale);
        }
        println!("Overall Feedback: {}", result.feedback);

        if index < results.len() - 1 {
            println!("{}", "=".repeat(50));
        }
    }
}

fn status_label(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Pending => "Pending",
        ProjectStatus::Judged => "Judged",
        ProjectStatus::Error => "Error",
    }
}

fn print_json(results: &[ProjectResult]) {
    match serde_json::to_string_pretty(results) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
