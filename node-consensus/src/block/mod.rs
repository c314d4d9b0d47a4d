//! Block-level consensus checks.

pub mod check;
pub mod subsidy;

pub use check::{
    coinbase_is_first, difficulty_is_valid, merkle_root_validity, size_is_valid, subsidy_is_valid,
    time_is_valid_at,
};
