use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Hardware API usage counters, one set per client.
#[derive(Debug, Default)]
pub struct HardwareApiMetrics {
    pub total_requests: AtomicU64,
    pub token_requests: AtomicU64,
    pub reauthentications: AtomicU64,
    pub errors: AtomicU64,
}

impl HardwareApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_token_request(&self) {
        self.token_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reauthentication(&self) {
        self.reauthentications.fetch_add(1, Ordering::Relaxed);
        warn!("Hardware API rejected the access token, re-authenticating");
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> HardwareApiStats {
        HardwareApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            token_requests: self.token_requests.load(Ordering::Relaxed),
            reauthentications: self.reauthentications.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Hardware API metrics: requests={}, token_requests={}, reauthentications={}, errors={}",
            stats.total_requests, stats.token_requests, stats.reauthentications, stats.errors
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareApiStats {
    pub total_requests: u64,
    pub token_requests: u64,
    pub reauthentications: u64,
    pub errors: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
