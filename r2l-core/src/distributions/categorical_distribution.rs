use super::{Distribution, check_rank2, check_shape};
use crate::{
    error::{R2lError, Result},
    rng::with_rng,
};
use candle_core::{D, DType, Error, Tensor};
use candle_nn::ops::{log_softmax, softmax};
use rand::distr::Distribution as _;
use rand::distr::weighted::WeightedIndex;

/// Distribution over `K` classes per row, parametrized by unnormalized logits of shape (B, K).
/// Actions are class indices shaped as a (B, 1) column.
#[derive(Debug, Clone)]
pub struct CategoricalDistribution {
    logits: Tensor,
}

impl CategoricalDistribution {
    pub fn from_logits(logits: Tensor) -> Result<Self> {
        check_rank2("categorical", &logits)?;
        Ok(Self { logits })
    }

    pub fn logits(&self) -> &Tensor {
        &self.logits
    }

    pub fn probs(&self) -> Result<Tensor> {
        Ok(softmax(&self.logits, D::Minus1)?)
    }

    pub fn num_classes(&self) -> Result<usize> {
        Ok(self.logits.dim(D::Minus1)?)
    }
}

impl Distribution for CategoricalDistribution {
    fn sample(&self) -> Result<Tensor> {
        let probs: Vec<Vec<f32>> = self.probs()?.to_vec2()?;
        let batch_size = probs.len();
        let actions = probs
            .iter()
            .map(|row| -> Result<u32> {
                let distribution = WeightedIndex::new(row).map_err(Error::wrap)?;
                Ok(with_rng(|rng| distribution.sample(rng)) as u32)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::from_vec(actions, (batch_size, 1), self.logits.device())?)
    }

    fn log_probs(&self, actions: &Tensor) -> Result<Tensor> {
        let (batch_size, _) = self.logits.dims2()?;
        check_shape("categorical log_probs", actions, &[batch_size, 1])?;
        let num_classes = self.num_classes()? as f64;
        let indices: Vec<f64> = actions.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
        // float encoded actions must still name a class exactly
        if let Some(action) = indices
            .into_iter()
            .find(|a| *a < 0. || a.fract() != 0. || *a >= num_classes)
        {
            return Err(R2lError::InvalidAction {
                op: "categorical log_probs",
                action,
            });
        }
        let actions = actions.to_dtype(DType::U32)?;
        let log_probs = log_softmax(&self.logits, D::Minus1)?;
        Ok(log_probs.gather(&actions, D::Minus1)?)
    }

    fn entropy(&self) -> Result<Tensor> {
        let log_probs = log_softmax(&self.logits, D::Minus1)?;
        let probs = log_probs.exp()?;
        Ok(probs.mul(&log_probs)?.sum(D::Minus1)?.neg()?)
    }

    fn mode(&self) -> Result<Tensor> {
        Ok(self.probs()?.argmax_keepdim(D::Minus1)?)
    }
}
