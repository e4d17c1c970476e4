//! Data layer — sources, processors and the instrumented wrappers around them.
//!
//! `fetch_historical` and `run_processor` are the only way the pipeline talks
//! to these collaborators. They record latency and volume metrics, register
//! lineage nodes and edges, and turn a failure into exactly one ERROR alert
//! before handing the error back to the caller.

pub mod csv_source;
pub mod fetch;
pub mod market_processor;
pub mod processor;
pub mod source;

pub use csv_source::CsvDataSource;
pub use fetch::{dataset_node_id, fetch_historical, source_node_id, FetchRequest, TrackedFrame};
pub use market_processor::MarketDataProcessor;
pub use processor::{run_processor, DataProcessor, ProcessError, Processed};
pub use source::{DataError, DataSource};
