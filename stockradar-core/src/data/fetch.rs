//! Instrumented historical fetch.

use std::time::Instant;

use chrono::NaiveDate;
use serde_json::json;

use super::{DataError, DataSource};
use crate::domain::MarketFrame;
use crate::observability::{DataNode, Metadata, Observability, Operation, OperationType, Severity};

/// Arguments of [`DataSource::get_historical_data`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub symbols: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub fields: Option<Vec<String>>,
}

/// A dataset plus the lineage node it was registered under.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    pub data: MarketFrame,
    pub node_id: String,
    pub metadata: Metadata,
}

/// Lineage id of a data source's node.
pub fn source_node_id(source: &str) -> String {
    format!("source:{source}")
}

/// Lineage id of the dataset a source produced.
pub fn dataset_node_id(source: &str) -> String {
    format!("dataset:{source}")
}

/// Fetch historical data through `source`, recording what happened in `obs`.
///
/// On success: latency `fetch_{name}`, data volume under the source name, a
/// source node, a dataset node and a READ edge between them. On failure: one
/// ERROR alert titled `Data Fetch Failed: {name}`, then the error is returned.
pub fn fetch_historical(
    source: &dyn DataSource,
    request: &FetchRequest,
    obs: &mut Observability,
) -> Result<TrackedFrame, DataError> {
    let name = source.name().to_string();
    let started = Instant::now();

    let mut source_node = DataNode::new(source_node_id(&name), &name, source.node_type());
    source_node.metadata = source.lineage_metadata();
    obs.lineage.add_node(source_node);

    let result = source.get_historical_data(
        &request.symbols,
        request.start,
        request.end,
        request.fields.as_deref(),
    );
    let data = match result {
        Ok(data) => data,
        Err(e) => {
            let mut metadata = Metadata::new();
            metadata.insert("error_type".to_string(), json!(e.kind()));
            metadata.insert("symbols".to_string(), json!(request.symbols));
            obs.alerts.trigger_alert(
                format!("Data Fetch Failed: {name}"),
                e.to_string(),
                Severity::Error,
                &name,
                metadata,
            );
            return Err(e);
        }
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    obs.metrics.record_latency(&format!("fetch_{name}"), elapsed_ms);
    obs.metrics.record_data_volume(&name, data.len());

    let hash = data.content_hash();
    let node_id = dataset_node_id(&name);
    obs.lineage.add_node(
        DataNode::new(&node_id, format!("{name} market data"), "table")
            .with_metadata("rows", data.len().to_string())
            .with_metadata("symbols", data.symbols().join(","))
            .with_metadata("content_hash", hash.clone()),
    );
    let operation = Operation::now(OperationType::Read, &name)
        .with_detail("rows", data.len().to_string());
    // Both nodes were registered above.
    if let Err(e) = obs.lineage.add_edge(&source_node_id(&name), &node_id, operation) {
        tracing::warn!(error = %e, "lineage edge not recorded");
    }

    tracing::info!(
        source = %name,
        rows = data.len(),
        elapsed_ms,
        "historical data fetched"
    );

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(name));
    metadata.insert("rows".to_string(), json!(data.len()));
    metadata.insert("content_hash".to_string(), json!(hash));
    metadata.insert(
        "fetched_at".to_string(),
        json!(chrono::Local::now().naive_local().to_string()),
    );
    Ok(TrackedFrame {
        data,
        node_id,
        metadata,
    })
}
