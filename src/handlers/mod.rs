//! Command Handlers module
//!
//! The enrollment ledger and the progress tracker. Each handler owns the
//! transaction for the state change it performs.

mod commands;
mod enrollment_ledger;
mod progress_tracker;

pub use commands::*;
pub use enrollment_ledger::EnrollmentLedger;
pub use progress_tracker::{ModuleEntry, ModuleListing, ProgressTracker};
