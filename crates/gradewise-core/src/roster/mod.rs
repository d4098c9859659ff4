//! Class roster removal
//!
//! Removing a student from a class is a small state machine: the UI asks for
//! confirmation, issues the delete, and only considers the removal finished
//! once a fresh roster read no longer lists the row.
//!
//! - `tracker.rs` - [`DeleteTracker`], the pure state machine
//! - `reconciler.rs` - [`RosterReconciler`], runs it against the query layer

pub mod reconciler;
pub mod tracker;

pub use reconciler::{RosterReconciler, DEFAULT_SYNC_ATTEMPTS, DEFAULT_SYNC_DELAY};
pub use tracker::{DeleteState, DeleteTracker};
