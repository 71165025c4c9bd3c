//! Local store metrics.

use metrics::{Counter, Gauge};

use crate::Mode;

/// Counters of one mode.
#[derive(Clone, Debug)]
pub(crate) struct ModeMetrics {
    /// Calls made in this mode
    calls_total: Counter,
    /// Calls that returned an error
    errors_total: Counter,
}

impl ModeMetrics {
    fn new(mode: Mode) -> Self {
        let mode: &'static str = mode.into();
        Self {
            calls_total: metrics::counter!("localstore_mode_calls_total", "mode" => mode),
            errors_total: metrics::counter!("localstore_mode_errors_total", "mode" => mode),
        }
    }

    pub(crate) fn record<T, E>(&self, result: &Result<T, E>) {
        self.calls_total.increment(1);
        if result.is_err() {
            self.errors_total.increment(1);
        }
    }
}

/// Local store metrics
#[derive(Clone, Debug)]
pub(crate) struct LocalStoreMetrics {
    syncing: ModeMetrics,
    upload: ModeMetrics,
    request: ModeMetrics,
    synced: ModeMetrics,
    access: ModeMetrics,
    removal: ModeMetrics,
    /// Chunks removed by garbage collection
    gc_evicted_total: Counter,
    /// Garbage collection passes run
    gc_runs_total: Counter,
    /// Value of the size counter
    size_chunks: Gauge,
}

impl Default for LocalStoreMetrics {
    fn default() -> Self {
        Self {
            syncing: ModeMetrics::new(Mode::Syncing),
            upload: ModeMetrics::new(Mode::Upload),
            request: ModeMetrics::new(Mode::Request),
            synced: ModeMetrics::new(Mode::Synced),
            access: ModeMetrics::new(Mode::Access),
            removal: ModeMetrics::new(Mode::Removal),
            gc_evicted_total: metrics::counter!("localstore_gc_evicted_total"),
            gc_runs_total: metrics::counter!("localstore_gc_runs_total"),
            size_chunks: metrics::gauge!("localstore_size_chunks"),
        }
    }
}

impl LocalStoreMetrics {
    pub(crate) const fn mode(&self, mode: Mode) -> &ModeMetrics {
        match mode {
            Mode::Syncing => &self.syncing,
            Mode::Upload => &self.upload,
            Mode::Request => &self.request,
            Mode::Synced => &self.synced,
            Mode::Access => &self.access,
            Mode::Removal => &self.removal,
        }
    }

    pub(crate) fn record_gc(&self, evicted: u64) {
        self.gc_runs_total.increment(1);
        self.gc_evicted_total.increment(evicted);
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn set_size(&self, size: u64) {
        self.size_chunks.set(size as f64);
    }
}
