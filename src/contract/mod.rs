//! Contract vocabulary and settlement rules
//!
//! Maps a prediction kind plus entry/current prices to a winning flag.
//! Barrier-style digit contracts read the last digit after a fixed sub-pip
//! scaling, which is independent of the string-based digit used by the
//! statistics stream.

mod evaluator;
mod types;

pub use evaluator::{scaled_last_digit, ContractEvaluator, DEFAULT_PIP_DECIMALS};
pub use types::{DurationType, PositionStatus, Prediction};
