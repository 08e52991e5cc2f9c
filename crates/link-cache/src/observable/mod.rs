//! # Observable Collections
//!
//! Lock-protected collections that publish every membership change as an
//! [`ListOperation`]/[`MapOperation`] on a `tokio::sync::broadcast` channel.
//! The mutation and the emission happen under the same lock, so subscribers
//! observe operations in the exact order they were applied and never see an
//! operation for a mutation that did not happen.
//!
//! Slow subscribers never block writers: they receive `RecvError::Lagged`
//! instead, which [`spawn_operation_handler`] forwards to
//! [`CollectionsOperationHandler::on_lagged`].

mod handler;
mod list;
mod map;
mod operation;

pub use handler::{CollectionsOperationHandler, spawn_operation_handler};
pub use list::ObservableList;
pub use map::ObservableMap;
pub use operation::{ListOperation, MapOperation};

/// Default buffer of operations kept for lagging subscribers.
pub const DEFAULT_OPERATION_CAPACITY: usize = 256;
