//! The block subsidy schedule.

pub mod general;

pub use general::{block_subsidy, block_value, find_output_with_amount};
