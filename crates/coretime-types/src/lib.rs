//! Common types for the on-demand coretime watcher.
//!
//! This crate defines the data shared by every watcher component: the events
//! flowing into the control loop, on-demand order and transaction types, the
//! ordering mode, supported relay chains and the credential wrapper.

/// Event types for the control loop channel.
pub mod events;
/// Ordering mode selection.
pub mod mode;
/// Supported relay chains.
pub mod networks;
/// On-demand order and extrinsic lifecycle types.
pub mod order;
/// Zeroizing credential wrapper.
pub mod secret_string;
/// Formatting helpers for logs.
pub mod utils;

pub use events::*;
pub use mode::{OrderingMode, UnknownMode};
pub use networks::{RelayChain, UnsupportedRelayChain};
pub use order::*;
pub use secret_string::SecretString;
pub use utils::{display_planck, truncate_id};
