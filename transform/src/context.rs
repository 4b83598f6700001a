//! Per-run pass state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

use crate::config::PassConfig;
use crate::strategy::{StrategyTable, TransposeTable};

// Shared by every pass instance in the process, whatever thread it runs on.
static SHARED_NAMES: Lazy<Arc<AtomicU64>> = Lazy::new(|| Arc::new(AtomicU64::new(0)));

/// Monotonic id source for inserted node names.
///
/// Only uniqueness matters, so increments use relaxed ordering.
#[derive(Debug, Clone)]
pub struct NameCounter(Arc<AtomicU64>);

impl NameCounter {
    /// Handle to the process-wide counter.
    pub fn shared() -> Self {
        Self(Arc::clone(&SHARED_NAMES))
    }

    /// Isolated counter whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self(Arc::new(AtomicU64::new(first)))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Everything a pass run reads besides the graph: configuration, the
/// conversion tables (built once here) and the name counter.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub config: PassConfig,
    pub strategies: StrategyTable,
    pub transposes: TransposeTable,
    pub names: NameCounter,
}

impl PassContext {
    pub fn new(config: PassConfig) -> Self {
        Self::with_names(config, NameCounter::shared())
    }

    pub fn with_names(config: PassConfig, names: NameCounter) -> Self {
        Self { config, strategies: StrategyTable::new(), transposes: TransposeTable::new(), names }
    }
}

impl Default for PassContext {
    fn default() -> Self {
        Self::new(PassConfig::default())
    }
}
