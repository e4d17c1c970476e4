//! Append-only metrics log.

use std::collections::{BTreeMap, VecDeque};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Retention;

pub const OPERATION_LATENCY: &str = "operation_latency";
pub const DATA_QUALITY_CHECK: &str = "data_quality_check";
pub const DATA_VOLUME: &str = "data_volume";

/// A single recorded measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: NaiveDateTime,
    pub labels: BTreeMap<String, String>,
}

/// Metrics log. Points are kept in insertion order and never mutated.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    points: VecDeque<MetricPoint>,
    retention: Retention,
    evicted: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    /// Record how long an operation took, in milliseconds.
    pub fn record_latency(&mut self, operation: &str, duration_ms: f64) {
        self.push(
            OPERATION_LATENCY,
            duration_ms,
            [("operation".to_string(), operation.to_string())],
        );
    }

    /// Record a pass/fail data quality check; `details` is stored as JSON text.
    pub fn record_data_quality(
        &mut self,
        check_name: &str,
        success: bool,
        details: &serde_json::Value,
    ) {
        self.push(
            DATA_QUALITY_CHECK,
            if success { 1.0 } else { 0.0 },
            [
                ("check_name".to_string(), check_name.to_string()),
                ("details".to_string(), details.to_string()),
            ],
        );
    }

    /// Record how many records a source produced.
    pub fn record_data_volume(&mut self, source: &str, record_count: usize) {
        self.push(
            DATA_VOLUME,
            record_count as f64,
            [("source".to_string(), source.to_string())],
        );
    }

    /// Every retained point, oldest first.
    pub fn get_metrics(&self) -> &VecDeque<MetricPoint> {
        &self.points
    }

    /// Retained points with the given metric name.
    pub fn points_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricPoint> {
        self.points.iter().filter(move |p| p.name == name)
    }

    /// Points dropped by the retention policy so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn push<const N: usize>(&mut self, name: &str, value: f64, labels: [(String, String); N]) {
        self.points.push_back(MetricPoint {
            name: name.to_string(),
            value,
            timestamp: chrono::Local::now().naive_local(),
            labels: labels.into_iter().collect(),
        });
        while self.retention.excess(self.points.len()) > 0 {
            self.points.pop_front();
            self.evicted += 1;
        }
    }
}
