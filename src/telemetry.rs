use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress events emitted by the driver while loading
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Destination table was (re)created
    TableInitialized { columns: usize },
    /// Batch of rows was appended to the destination table
    BatchLoaded { rows_loaded: u64, duration_ms: u64 },
}

/// Statistics aggregated from telemetry events
#[derive(Debug, Default, Clone)]
pub struct ProgressStats {
    pub columns: usize,
    pub batches_loaded: usize,
    pub rows_loaded: u64,
    pub batch_durations_ms: Vec<u64>,
}

impl ProgressStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a telemetry event
    pub fn update(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::TableInitialized { columns } => {
                self.columns = *columns;
            }
            TelemetryEvent::BatchLoaded {
                rows_loaded,
                duration_ms,
            } => {
                self.batches_loaded += 1;
                self.rows_loaded += rows_loaded;
                self.batch_durations_ms.push(*duration_ms);
            }
        }
    }

    /// Calculate percentile from batch durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.batch_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.batch_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = index.saturating_sub(1).min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}

/// Console progress for a run: a rows bar plus one line per appended batch
///
/// Hidden reporters print nothing.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(total_rows: u64, quiet: bool) -> Result<Self> {
        if quiet {
            return Ok(Self::hidden());
        }

        let bar = ProgressBar::new(total_rows);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] Rows: [{bar:30.green/blue}] {human_pos}/{human_len} ({percent}%) | {per_sec} | {msg}")?
                .progress_chars("=>-"),
        );
        Ok(Self { bar: Some(bar) })
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    /// Record the first batch, which creates the table and prints no line
    pub fn table_loaded(&self, stats: &ProgressStats) {
        if let Some(bar) = &self.bar {
            bar.set_position(stats.rows_loaded);
        }
    }

    pub fn batch_loaded(&self, stats: &ProgressStats, elapsed: Duration) {
        let Some(bar) = &self.bar else {
            return;
        };

        // println on the bar is dropped when stdout is not a terminal
        bar.suspend(|| {
            println!(
                "inserted another chunk, took {:.3} second(s)",
                elapsed.as_secs_f64()
            )
        });
        bar.set_position(stats.rows_loaded);
        if let (Some(p50), Some(p90), Some(p99)) = stats.get_percentiles() {
            bar.set_message(format!("p50: {}ms, p90: {}ms, p99: {}ms", p50, p90, p99));
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish();
            println!("Finished ingesting data into the postgres database");
        }
    }
}
