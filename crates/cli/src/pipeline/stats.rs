//! Run statistics.

use std::time::Duration;

use dispatcher::ShutdownReport;

/// Statistics from a router run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Normalization counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Worker pool counters
    pub dispatch: dispatcher::MetricsSnapshot,

    /// Sensors registered during the run
    pub sensors_created: u64,

    /// How the worker pool ended
    pub shutdown: ShutdownReport,

    /// Total duration of the run
    pub duration: Duration,
}

impl PipelineStats {
    /// Processed messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed messages as percentage of processed ones
    pub fn error_rate(&self) -> f64 {
        if self.dispatch.processed > 0 {
            (self.dispatch.errors() as f64 / self.dispatch.processed as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Router Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Messages processed: {}", self.dispatch.processed);
        println!("   ├─ Throughput: {:.2} msg/s", self.throughput());
        println!("   └─ Sensors created: {}", self.sensors_created);

        println!("\nOutcomes");
        println!("   ├─ Stored: {}", self.dispatch.stored);
        println!("   ├─ Discarded (no persistable field): {}", self.dispatch.discarded);
        println!("   ├─ Skipped: {}", self.dispatch.skipped);
        println!("   ├─ Decode errors: {}", self.ingestion.decode_errors);
        println!("   ├─ Parse errors: {}", self.ingestion.parse_errors);
        println!("   ├─ Shape errors: {}", self.ingestion.shape_errors);
        println!("   ├─ Persistence errors: {}", self.dispatch.persistence_errors);
        println!("   └─ Error rate: {:.2}%", self.error_rate());

        println!("\nLatency (ms)");
        println!("   └─ {}", self.dispatch.latency_ms);

        if !self.shutdown.drained {
            println!("\nShutdown");
            println!("   ├─ Workers abandoned: {}", self.shutdown.abandoned);
            println!("   └─ Messages left in queue: {}", self.shutdown.left_in_queue);
        }

        println!();
    }
}
