//! Domain types: OHLCV bars, the market frame the pipeline threads through
//! strategies, and the signal table strategies produce.

pub mod bar;
pub mod frame;
pub mod signal;

pub use bar::Bar;
pub use frame::{FrameError, MarketFrame, BASE_FIELDS};
pub use signal::{Signal, SignalRow, SignalTable};
