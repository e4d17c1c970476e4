//! Observability — metrics log, alert bus and lineage graph for one pipeline run.
//!
//! One [`Observability`] context is created per run and passed by `&mut`
//! through the call chain; there is no process-wide state. Every component
//! appends to it, and the run exports a read-only view at the end.

pub mod alerts;
pub mod lineage;
pub mod metrics;

pub use alerts::{
    Alert, AlertManager, AlertNotifier, ConsoleNotifier, DeliveryReport, LogNotifier, Metadata,
    NotifierError, Severity,
};
pub use lineage::{
    DataNode, GraphSnapshot, LineageEdge, LineageError, LineageGraph, Operation, OperationType,
};
pub use metrics::{MetricPoint, MetricsCollector};

use serde::{Deserialize, Serialize};

/// Retention policy for append-only logs (metrics, alert history).
///
/// The lineage graph has no retention: evicting nodes would leave edges
/// pointing at nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retention {
    #[default]
    Unbounded,
    /// Keep only the most recent `n` entries; older entries are dropped.
    KeepLast(usize),
}

impl Retention {
    /// How many of `len` entries must be dropped from the front.
    pub fn excess(self, len: usize) -> usize {
        match self {
            Retention::Unbounded => 0,
            Retention::KeepLast(n) => len.saturating_sub(n),
        }
    }
}

/// Per-run observability context.
#[derive(Debug, Default)]
pub struct Observability {
    pub metrics: MetricsCollector,
    pub alerts: AlertManager,
    pub lineage: LineageGraph,
}

impl Observability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(metrics: Retention, alerts: Retention) -> Self {
        Self {
            metrics: MetricsCollector::with_retention(metrics),
            alerts: AlertManager::with_retention(alerts),
            lineage: LineageGraph::new(),
        }
    }

    /// Point-in-time copy of everything recorded so far.
    pub fn export(&self) -> ObservabilityExport {
        ObservabilityExport {
            metrics: self.metrics.get_metrics().iter().cloned().collect(),
            evicted_metrics: self.metrics.evicted(),
            alerts: self.alerts.history().iter().cloned().collect(),
            evicted_alerts: self.alerts.evicted(),
            lineage: self.lineage.export_graph(),
        }
    }
}

/// Serializable end-of-run view of an [`Observability`] context.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilityExport {
    pub metrics: Vec<MetricPoint>,
    pub evicted_metrics: u64,
    pub alerts: Vec<Alert>,
    pub evicted_alerts: u64,
    pub lineage: GraphSnapshot,
}
