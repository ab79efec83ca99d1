//! Terminal output: progress bar, coloured results and listings.
//!
//! `indicatif` draws the bar and `console` provides the colours.

use std::ops::RangeInclusive;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use pdf_toolbox::job::{JobProgress, JobResult};
use pdf_toolbox::ops::Registry;
use pdf_toolbox::presets::Preset;

/// Live view of one job in the terminal.
///
/// Starts as a spinner and switches to a bar once the job reports a total.
pub struct JobDisplay {
    pb: ProgressBar,
    determinate: bool,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobDisplay {
    pub fn start(title: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(title.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            determinate: false,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn update(&mut self, progress: &JobProgress) {
        if progress.total > 0 {
            if !self.determinate {
                self.pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                self.determinate = true;
            }
            self.pb.set_length(progress.total);
            self.pb.set_position(progress.current);
        }
        if progress.message.is_empty() {
            self.pb.set_message(progress.stage.clone());
        } else {
            self.pb
                .set_message(format!("{}: {}", progress.stage, progress.message));
        }
    }

    pub fn note(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.yellow.apply_to("!")));
    }

    /// Clear the bar and print the outcome.
    pub fn finish(&self, result: &JobResult) {
        self.pb.finish_and_clear();
        if result.cancelled {
            println!("  {} Job cancelled", self.yellow.apply_to("■"));
        } else if result.success {
            println!("  {} Job completed successfully", self.green.apply_to("✓"));
            for output in &result.outputs {
                println!("    {}", output.display());
            }
        } else {
            println!(
                "  {} Job failed: {}",
                self.red.apply_to("✗"),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        if let Some(warning) = &result.warning {
            println!("  {} {warning}", self.yellow.apply_to("warning:"));
        }
    }
}

pub fn print_tools(registry: &Registry) {
    let bold = Style::new().bold();
    for op in registry.operations() {
        println!("{:<18} {}", bold.apply_to(op.tool_id()), op.display_name());
    }
}

/// Pages are shown 1-based, as the user typed them.
pub fn print_pages(pages: &[usize]) {
    let shown: Vec<String> = pages.iter().map(|p| (p + 1).to_string()).collect();
    println!("{} page(s): {}", pages.len(), shown.join(", "));
}

pub fn print_spans(spans: &[RangeInclusive<usize>]) {
    let shown: Vec<String> = spans
        .iter()
        .map(|span| {
            if span.start() == span.end() {
                span.start().to_string()
            } else {
                format!("{}-{}", span.start(), span.end())
            }
        })
        .collect();
    println!("valid range: {}", shown.join(", "));
}

pub fn print_presets(presets: &[Preset]) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for preset in presets {
        println!(
            "{:<16} {:<18} {}",
            bold.apply_to(&preset.id),
            preset.tool_id,
            dim.apply_to(&preset.name)
        );
    }
}
