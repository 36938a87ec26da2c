//! Stop enforcement: when an open position must be exited.

mod exit_trigger;

pub use exit_trigger::{ExitTrigger, evaluate_exit};
