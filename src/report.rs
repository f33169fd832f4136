//! Per-call latency recording and the final run summary

use crate::dispatch::{RunSummary, StopReason};
use crate::error::Result;
use hdrhistogram::Histogram;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Histogram upper bound in milliseconds (10 minutes).
const MAX_LATENCY_MS: u64 = 600_000;

/// One completed call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub sequence: u64,
    pub client: usize,
    pub verb: &'static str,
    /// Launch time relative to run start
    pub started: Duration,
    pub latency: Duration,
    pub success: bool,
}

type CsvSink = csv::Writer<Box<dyn Write + Send>>;

/// Collects call latencies. Safe to share between every in-flight call.
pub struct LatencyRecorder {
    histogram: Mutex<Histogram<u64>>,
    csv: Option<Mutex<CsvSink>>,
}

impl LatencyRecorder {
    /// Histogram only, nothing written to disk.
    pub fn new() -> Result<Self> {
        Ok(Self {
            histogram: Mutex::new(new_histogram()?),
            csv: None,
        })
    }

    /// Also append one CSV row per call to `path`.
    pub fn with_csv_file(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Self::with_csv_writer(Box::new(file))
    }

    pub fn with_csv_writer(writer: Box<dyn Write + Send>) -> Result<Self> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "sequence",
            "client",
            "verb",
            "started_ms",
            "latency_ms",
            "outcome",
        ])?;

        Ok(Self {
            histogram: Mutex::new(new_histogram()?),
            csv: Some(Mutex::new(csv)),
        })
    }

    pub async fn record(&self, record: &CallRecord) {
        let latency_ms = (record.latency.as_millis() as u64).clamp(1, MAX_LATENCY_MS);
        self.histogram.lock().await.saturating_record(latency_ms);

        if let Some(csv) = &self.csv {
            let row = [
                record.sequence.to_string(),
                record.client.to_string(),
                record.verb.to_string(),
                record.started.as_millis().to_string(),
                format!("{:.3}", record.latency.as_secs_f64() * 1000.0),
                if record.success { "success" } else { "failure" }.to_string(),
            ];
            if let Err(e) = csv.lock().await.write_record(&row) {
                warn!("Failed to write latency record: {}", e);
            }
        }
    }

    pub async fn flush(&self) -> Result<()> {
        if let Some(csv) = &self.csv {
            csv.lock().await.flush()?;
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> LatencyStats {
        LatencyStats::from_histogram(&*self.histogram.lock().await)
    }
}

fn new_histogram() -> Result<Histogram<u64>> {
    Ok(Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_MS, 3)?)
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub min: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

impl LatencyStats {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::default();
        }
        Self {
            count: hist.len(),
            min: hist.min(),
            mean: hist.mean(),
            p50: hist.value_at_quantile(0.50),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
            max: hist.max(),
        }
    }
}

pub fn print_summary(summary: &RunSummary, latency: &LatencyStats) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║                      RUN SUMMARY                           ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    info!("");
    info!("Calls:");
    info!("  Launched:     {}", summary.launched);
    info!("  Succeeded:    {}", summary.succeeded);
    info!("  Failed:       {}", summary.failed);
    info!("  Stopped by:   {}", describe(summary.stop_reason));
    info!("  Elapsed:      {:.2?}", summary.elapsed);
    info!("  Achieved QPS: {:.2}", summary.achieved_rate());

    info!("");
    info!("Latency (ms):");
    if latency.count > 0 {
        info!("  Min:    {}", latency.min);
        info!("  Mean:   {:.2}", latency.mean);
        info!("  p50:    {}", latency.p50);
        info!("  p95:    {}", latency.p95);
        info!("  p99:    {}", latency.p99);
        info!("  Max:    {}", latency.max);
    } else {
        info!("  No data");
    }

    info!("");
    info!("═══════════════════════════════════════════════════════════");
}

fn describe(reason: Option<StopReason>) -> &'static str {
    match reason {
        Some(StopReason::Interrupted) => "interrupt",
        Some(StopReason::TargetReached) => "target reached",
        Some(StopReason::DeadlineElapsed) => "deadline",
        None => "-",
    }
}
