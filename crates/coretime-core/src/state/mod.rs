//! Controller-owned state.

pub mod order;

pub use order::{OrderState, OrderStateError};
