pub mod bernoulli_distribution;
pub mod categorical_distribution;
pub mod diagonal_distribution;

use crate::error::{R2lError, Result};
use bernoulli_distribution::BernoulliDistribution;
use candle_core::Tensor;
use categorical_distribution::CategoricalDistribution;
use diagonal_distribution::DiagGaussianDistribution;
use enum_dispatch::enum_dispatch;

/// An action distribution produced by one forward pass of a policy head, batched over rows.
#[enum_dispatch]
pub trait Distribution {
    /// One action per batch row. Samples are detached from the autograd graph.
    fn sample(&self) -> Result<Tensor>;

    /// Log likelihood of `actions` summed over the action dimension, shape (B, 1).
    fn log_probs(&self, actions: &Tensor) -> Result<Tensor>;

    /// Entropy summed over the action dimension, shape (B,).
    fn entropy(&self) -> Result<Tensor>;

    /// The deterministic action used for evaluation.
    fn mode(&self) -> Result<Tensor>;
}

#[enum_dispatch(Distribution)]
#[derive(Debug, Clone)]
pub enum DistributionKind {
    Categorical(CategoricalDistribution),
    DiagGaussian(DiagGaussianDistribution),
    Bernoulli(BernoulliDistribution),
}

// Actions must match exactly, a broadcast here would silently rescale the policy gradient.
pub(crate) fn check_shape(op: &'static str, t: &Tensor, expected: &[usize]) -> Result<()> {
    if t.dims() != expected {
        return Err(R2lError::shape_mismatch(op, expected, t.dims()));
    }
    Ok(())
}

pub(crate) fn check_rank2(op: &'static str, t: &Tensor) -> Result<(usize, usize)> {
    match t.dims() {
        [batch, dim] => Ok((*batch, *dim)),
        dims => Err(R2lError::ShapeMismatch {
            op,
            // rank 2 expected, sizes unknown
            expected: vec![],
            got: dims.to_vec(),
        }),
    }
}
