//! Transaction-level consensus checks.

pub mod check;
pub mod connect;

pub use check::{check_transaction, is_final};
pub use connect::{connect_inputs, PreviousOutput, PreviousOutputLookup};
