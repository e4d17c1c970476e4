//! DataProcessor trait and its instrumented runner.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::json;
use thiserror::Error;

use super::TrackedFrame;
use crate::domain::{FrameError, MarketFrame};
use crate::observability::{
    DataNode, LineageError, Metadata, MetricsCollector, Observability, Operation, OperationType,
    Severity,
};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("processor '{processor}' failed: {reason}")]
    Failed { processor: String, reason: String },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Lineage(#[from] LineageError),
}

impl ProcessError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Failed { .. } => "failed",
            ProcessError::Frame(_) => "frame",
            ProcessError::Lineage(_) => "lineage",
        }
    }
}

/// Output of a processor: the transformed table and what was done to it.
#[derive(Debug, Clone)]
pub struct Processed {
    pub data: MarketFrame,
    pub metadata: Metadata,
}

/// A whole-table transformation run once before any strategy.
pub trait DataProcessor {
    /// Short name used in metric labels and alert titles (e.g. "market_data").
    fn name(&self) -> &str;

    /// Display name of the processor's lineage node.
    fn display_name(&self) -> String {
        self.name().to_string()
    }

    fn node_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Transform `data`. Data-quality checks go to `metrics`.
    fn process(
        &self,
        data: MarketFrame,
        metrics: &mut MetricsCollector,
    ) -> Result<Processed, ProcessError>;
}

/// Lineage id of a processor's node.
pub fn processor_node_id(name: &str) -> String {
    format!("processor:{name}")
}

/// Run `processor` over `input`, recording what happened in `obs`.
///
/// On success: latency `process_{name}`, volumes `{name}_input` and
/// `{name}_output`, and a TRANSFORM edge from the input's node to the
/// processor's node. On failure: one ERROR alert titled
/// `Data Processing Failed: {name}`, then the error is returned.
pub fn run_processor(
    processor: &dyn DataProcessor,
    input: TrackedFrame,
    obs: &mut Observability,
) -> Result<TrackedFrame, ProcessError> {
    let name = processor.name().to_string();
    let node_id = processor_node_id(&name);
    let started = Instant::now();

    let mut node = DataNode::new(&node_id, processor.display_name(), "processor");
    node.metadata = processor.node_metadata();
    obs.lineage.add_node(node);

    let TrackedFrame {
        data,
        node_id: input_node,
        metadata: input_metadata,
    } = input;
    let input_rows = data.len();

    let outcome = processor.process(data, &mut obs.metrics).and_then(|processed| {
        let operation = Operation::now(OperationType::Transform, &name)
            .with_detail("transformation", format!("{name}_processing"));
        obs.lineage.add_edge(&input_node, &node_id, operation)?;
        Ok(processed)
    });

    let processed = match outcome {
        Ok(processed) => processed,
        Err(e) => {
            let mut metadata = Metadata::new();
            metadata.insert("error_type".to_string(), json!(e.kind()));
            metadata.insert("input_metadata".to_string(), json!(input_metadata));
            obs.alerts.trigger_alert(
                format!("Data Processing Failed: {name}"),
                e.to_string(),
                Severity::Error,
                &name,
                metadata,
            );
            return Err(e);
        }
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    obs.metrics.record_latency(&format!("process_{name}"), elapsed_ms);
    obs.metrics.record_data_volume(&format!("{name}_input"), input_rows);
    obs.metrics
        .record_data_volume(&format!("{name}_output"), processed.data.len());
    tracing::info!(
        processor = %name,
        input_rows,
        output_rows = processed.data.len(),
        elapsed_ms,
        "data processed"
    );

    let mut metadata = input_metadata;
    metadata.extend(processed.metadata);
    Ok(TrackedFrame {
        data: processed.data,
        node_id,
        metadata,
    })
}
