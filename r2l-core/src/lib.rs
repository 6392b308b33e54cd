pub mod distributions;
pub mod env;
pub mod error;
pub mod evaluation;
pub mod policies;
pub mod rng;
pub mod tensors;
pub mod utils;
