//! StockRadar Core — observability, component contracts, plugin registry, market data.
//!
//! This crate contains everything the pipeline runner drives:
//! - Observability primitives: metrics log, alert bus, lineage graph
//! - `Factor` / `Strategy` traits and the plugin registry that constructs them
//! - Reference factors and strategies registered as built-ins
//! - Market data frame, data-source and processor contracts, CSV source
//! - Signal table persistence

pub mod components;
pub mod data;
pub mod domain;
pub mod observability;
pub mod persist;
pub mod series;
