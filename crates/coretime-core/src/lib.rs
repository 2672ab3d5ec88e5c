//! Trigger-and-order control loop of the on-demand coretime watcher.
//!
//! Signals from the monitor crate are fed to an ordering strategy, the
//! controller enforces that at most one purchase is in flight and that no
//! purchase starts while a previously bought core is still queued, and the
//! submitter turns each purchase into exactly one outcome event.

pub mod engine;
pub mod state;
pub mod strategy;
pub mod submitter;

pub use engine::controller::{Effect, OrderController, WatchdogReport};
pub use engine::{CoretimeEngine, EngineError};
pub use state::{OrderState, OrderStateError};
pub use strategy::{
	BlockCountStrategy, OrderDecision, OrderingStrategy, SkipReason, TransactionPoolStrategy,
};
pub use submitter::OrderSubmitter;
