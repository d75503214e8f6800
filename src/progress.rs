use std::sync::Mutex;
use std::time::Duration;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::app::{PipelineResult, ProgressEvent, ProgressSink};

const BAR_TEMPLATE: &str = "{prefix:.cyan} | {bar:40.cyan} | {percent}% || {pos}/{len} {msg}";

/// Renders upload batches and patched records as progress bars on stderr.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_bar(&self, prefix: &str, len: u64, unit: &str) {
        let bar = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr_with_hz(12));
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("\u{2588}\u{2588}\u{2591}"),
        );
        bar.set_prefix(prefix.to_string());
        bar.set_message(unit.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.bar.lock()
            && let Some(previous) = guard.replace(bar)
        {
            previous.finish();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish();
        }
    }

    fn println(&self, line: String) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            bar.println(line);
            return;
        }
        eprintln!("{line}");
    }

    pub fn print_summary(result: &PipelineResult) {
        println!("{}", format!("Collection {}", result.collection).cyan());
        if let Some(records) = result.seeded_records {
            println!("{}", format!("  metadata records generated: {records}").green());
        }
        println!(
            "{}",
            format!(
                "  images:   {} files, cid {}",
                result.images.uploaded_filenames.len(),
                result.images.content_id
            )
            .green()
        );
        println!(
            "{}",
            format!("  patched:  {} records", result.patched_records).green()
        );
        println!(
            "{}",
            format!(
                "  metadata: {} files, cid {}",
                result.metadata.uploaded_filenames.len(),
                result.metadata.content_id
            )
            .green()
        );
    }
}

impl ProgressSink for TerminalProgress {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.finish_bar();
                eprintln!("{} {message}", format!("[{}]", phase.label()).yellow());
            }
            ProgressEvent::SeedStarted { records } => {
                self.println(format!("metadata records in CSV:\t{records}"));
            }
            ProgressEvent::UploadStarted {
                label,
                file_count,
                batch_count,
            } => {
                eprintln!("number of files:\t{file_count}");
                self.start_bar(&format!("upload {label}"), batch_count as u64, "Chunks");
            }
            ProgressEvent::BatchCompleted { completed, .. } => {
                self.with_bar(|bar| bar.set_position(completed as u64));
            }
            ProgressEvent::UploadFinished {
                label, content_id, ..
            } => {
                self.finish_bar();
                eprintln!(
                    "{}",
                    format!("successfully uploaded to {label} (cid: \"{content_id}\")").green()
                );
            }
            ProgressEvent::PatchStarted { total } => {
                self.start_bar("update metadata", total as u64, "Records");
            }
            ProgressEvent::RecordPatched { completed, total, .. } => {
                self.with_bar(|bar| bar.set_position(completed as u64));
                if completed == total {
                    self.finish_bar();
                }
            }
        }
    }
}
