use crate::ui::{palette, Glyph};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Bar driven by the bench command while rows are inserted
pub struct InsertProgress {
    pb: ProgressBar,
}

impl InsertProgress {
    pub fn new(total: u64) -> Self {
        let pb = if console::Term::stdout().is_term() {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {per_sec} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message("Inserting");
        Self { pb }
    }

    pub fn inc(&self, rows: u64) {
        self.pb.inc(rows);
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_summary(&self, duration: Duration, rows: usize, listed: usize) {
        self.pb.finish_and_clear();
        println!(
            "{} {}",
            Glyph::SAVED,
            format!("Complete in {}", HumanDuration(duration)).style(palette().saved)
        );
        println!(
            "  {} {} inserted  {} {} listed",
            Glyph::FILE,
            rows,
            Glyph::FOLDER,
            listed
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if console::Term::stdout().is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
