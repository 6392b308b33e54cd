use super::{Distribution, check_rank2, check_shape};
use crate::{error::Result, rng::with_rng};
use candle_core::{D, DType, Tensor};
use candle_nn::ops::sigmoid;
use rand::Rng;

/// Independent binary action per dimension, parametrized by logits of shape (B, A).
#[derive(Debug, Clone)]
pub struct BernoulliDistribution {
    logits: Tensor,
}

// log(1 + exp(x)) without overflowing for large x
fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = (x.abs()?.neg()?.exp()? + 1.)?.log()?;
    Ok((x.relu()? + tail)?)
}

impl BernoulliDistribution {
    pub fn from_logits(logits: Tensor) -> Result<Self> {
        check_rank2("bernoulli", &logits)?;
        Ok(Self { logits })
    }

    pub fn logits(&self) -> &Tensor {
        &self.logits
    }

    pub fn probs(&self) -> Result<Tensor> {
        Ok(sigmoid(&self.logits)?)
    }
}

impl Distribution for BernoulliDistribution {
    fn sample(&self) -> Result<Tensor> {
        let probs = self.probs()?;
        let (batch_size, action_size) = probs.dims2()?;
        let probs: Vec<f32> = probs.flatten_all()?.to_vec1()?;
        let samples: Vec<f32> = with_rng(|rng| {
            probs
                .iter()
                .map(|p| if rng.random::<f32>() < *p { 1. } else { 0. })
                .collect()
        });
        Ok(Tensor::from_vec(
            samples,
            (batch_size, action_size),
            self.logits.device(),
        )?)
    }

    // log p(a) = a * l - softplus(l)
    fn log_probs(&self, actions: &Tensor) -> Result<Tensor> {
        check_shape("bernoulli log_probs", actions, self.logits.dims())?;
        let actions = actions.to_dtype(self.logits.dtype())?;
        let log_probs = (actions.mul(&self.logits)? - softplus(&self.logits)?)?;
        Ok(log_probs.sum_keepdim(D::Minus1)?)
    }

    // H = softplus(l) - p * l per dimension
    fn entropy(&self) -> Result<Tensor> {
        let probs = self.probs()?;
        let entropy = (softplus(&self.logits)? - probs.mul(&self.logits)?)?;
        Ok(entropy.sum(D::Minus1)?)
    }

    fn mode(&self) -> Result<Tensor> {
        Ok(self.probs()?.gt(0.5)?.to_dtype(DType::F32)?)
    }
}
