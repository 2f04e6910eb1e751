//! Progress bar for corpus runs

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ug40_pipeline::{FileStatus, RunObserver};

/// Drives an indicatif bar from pipeline callbacks
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        bar.set_message("discovering files");
        Ok(Self { bar })
    }

    /// Reporter that draws nothing (non-interactive output, tests)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl RunObserver for ProgressReporter {
    fn on_discovered(&self, files: usize) {
        self.bar.set_length(files as u64);
        self.bar.set_message("ingesting");
    }

    fn on_file_done(&self, file_id: &str, status: &FileStatus) {
        match status {
            FileStatus::Failed(reason) => {
                self.bar
                    .println(format!("failed {}: {}", file_id, reason));
            }
            FileStatus::Processed { accepted, .. } if *accepted > 0 => {
                self.bar.set_message(format!("{} (+{})", file_id, accepted));
            }
            _ => {}
        }
        self.bar.inc(1);
    }
}
