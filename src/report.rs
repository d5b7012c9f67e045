//! Pre-run preview and post-run summary

use colored::Colorize;
use sequencer::{ErrorCategory, ProbeState, RunFailure, RunReport, StepOutcome, StepPreview};

use crate::ui;

/// Show what each step would do, based on current state
pub fn display_preview(target: &str, previews: &[StepPreview]) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Provisioning Plan".bold()
    );
    println!("│ {} {}", "Target:".dimmed(), target);
    println!("│");

    for preview in previews {
        let (symbol, note) = match &preview.state {
            ProbeState::Satisfied { .. } => ("○".dimmed(), "done".dimmed()),
            ProbeState::Unsatisfied { .. } => ("+".green(), "pending".green()),
            ProbeState::Unknown { .. } => ("?".yellow(), "unknown".yellow()),
        };
        println!(
            "│   {} {:<16} {} {}",
            symbol,
            preview.name,
            preview.description,
            format!("[{note}]").dimmed()
        );
        if let ProbeState::Unknown { reason } = &preview.state {
            println!("│       {}", reason.yellow());
        }
    }

    let pending = previews.iter().filter(|p| p.is_pending()).count();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} of {} steps pending",
        pending.to_string().bold(),
        previews.len()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Whether anything in the preview needs action
pub fn has_pending(previews: &[StepPreview]) -> bool {
    previews.iter().any(StepPreview::is_pending)
}

/// Print the outcome of a completed run
pub fn print_summary(report: &RunReport) {
    println!();
    if report.executed() == 0 {
        ui::success(&format!(
            "{} already provisioned, nothing to do",
            report.target
        ));
    } else {
        println!("  {} Provisioning complete!", "✓".green().bold());
    }
    print_counts(report);
}

/// Print how far a stopped run got
pub fn print_failure(failure: &RunFailure) {
    let category = failure.error.category();
    println!();
    println!(
        "  {} {} after {} of its steps",
        "✗".red().bold(),
        "Provisioning stopped".bold(),
        failure.report.total()
    );
    if failure.report.total() > 0 {
        print_counts(&failure.report);
    }
    if category != ErrorCategory::Validation {
        ui::dim(category.advice());
    }
}

fn print_counts(report: &RunReport) {
    for record in &report.records {
        match &record.outcome {
            StepOutcome::Executed { .. } => {
                println!("    • {} {}", record.name, "executed".green());
            }
            StepOutcome::Skipped { .. } => {
                println!("    • {} {}", record.name, "skipped".dimmed());
            }
        }
    }
    println!(
        "    {} executed, {} skipped",
        report.executed().to_string().bold(),
        report.skipped()
    );
}
