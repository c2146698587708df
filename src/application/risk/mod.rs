//! Risk policy evaluation.
//!
//! Turns an account snapshot into an ordered list of close, block and
//! alert actions.

pub mod evaluator;
pub mod ordering;

pub use evaluator::{total_drawdown_percent, Evaluation, EvaluationInput, PolicyEvaluator};
pub use ordering::select_excess;
