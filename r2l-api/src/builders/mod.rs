pub mod distribution;
pub mod env;
pub mod evaluator;
pub mod policies;
