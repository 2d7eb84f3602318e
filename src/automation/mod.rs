//! Trigger-based automation: rule evaluation and system signals

pub mod engine;
pub mod signals;

pub use engine::{AutomationEngine, SignalSource, TICK_INTERVAL};
pub use signals::SystemSignals;
