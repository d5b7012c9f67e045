//! Console progress for a run: one spinner line per active step

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sequencer::{Error, ProgressCallback, StepOutcome};
use std::time::Duration;

use crate::ui;

const TICK: Duration = Duration::from_millis(100);

/// Progress reporter that draws to the terminal
#[derive(Default)]
pub struct ConsoleProgress {
    spinner: Option<ProgressBar>,
    current: Option<(usize, usize)>,
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    fn prefix(&self) -> String {
        self.current
            .map(|(index, total)| ui::step_counter(index, total))
            .unwrap_or_default()
    }

    fn start_spinner(&mut self, message: String) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.blue.bold} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_prefix(self.prefix());
        pb.set_message(message);
        pb.enable_steady_tick(TICK);
        self.spinner = Some(pb);
    }

    fn clear_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn line(&self, symbol: colored::ColoredString, message: &str) {
        if !self.quiet {
            println!("{} {} {}", symbol, self.prefix().blue().bold(), message);
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_run_start(&mut self, target: &str, total: usize) {
        if !self.quiet {
            ui::header(&format!("Provisioning {target}"));
            ui::dim(&format!("{total} steps"));
            println!();
        }
    }

    fn on_step_start(&mut self, index: usize, total: usize, _name: &str, description: &str) {
        self.current = Some((index, total));
        self.start_spinner(description.to_string());
    }

    fn on_step_skipped(&mut self, name: &str, reason: &str) {
        self.clear_spinner();
        self.line("○".dimmed(), &format!("{} {}", name, format!("({reason})").dimmed()));
    }

    fn on_retry(
        &mut self,
        name: &str,
        attempt: u32,
        max_attempts: u32,
        error: &Error,
        delay: Duration,
    ) {
        let message = format!(
            "{}: {} (attempt {}/{}, retrying in {:.1}s)",
            name,
            error,
            attempt,
            max_attempts,
            delay.as_secs_f64()
        );
        match &self.spinner {
            Some(pb) => pb.set_message(message),
            None => log::warn!("{message}"),
        }
    }

    fn on_step_complete(&mut self, name: &str, outcome: &StepOutcome) {
        self.clear_spinner();
        let detail = match outcome {
            StepOutcome::Executed { attempts } if *attempts > 1 => {
                format!(" {}", format!("(after {attempts} attempts)").dimmed())
            }
            _ => String::new(),
        };
        self.line("✓".green(), &format!("{name}{detail}"));
    }

    fn on_step_failed(&mut self, name: &str, _error: &Error) {
        self.clear_spinner();
        self.line("✗".red(), &name.red().to_string());
    }
}
