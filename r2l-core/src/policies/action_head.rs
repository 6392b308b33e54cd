use crate::{
    distributions::{
        DistributionKind, bernoulli_distribution::BernoulliDistribution,
        categorical_distribution::CategoricalDistribution,
        diagonal_distribution::DiagGaussianDistribution,
    },
    env::Space,
    error::{R2lError, Result},
    utils::orthogonal::{orthogonal_linear, register_var},
};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Linear, VarMap};

/// Small output gain keeps the initial discrete and binary policies close to uniform.
pub const SMALL_OUTPUT_GAIN: f64 = 0.01;
pub const MEAN_OUTPUT_GAIN: f64 = 1.0;

/// Emits logits, the distribution derives probabilities with a softmax.
#[derive(Debug, Clone)]
pub struct CategoricalHead {
    linear: Linear,
}

impl CategoricalHead {
    pub fn build(
        input_dim: usize,
        num_actions: usize,
        varmap: &VarMap,
        prefix: &str,
        device: &Device,
    ) -> Result<Self> {
        let linear = orthogonal_linear(
            input_dim,
            num_actions,
            SMALL_OUTPUT_GAIN,
            varmap,
            &format!("{prefix}.linear"),
            device,
        )?;
        Ok(Self { linear })
    }

    pub fn forward(&self, features: &Tensor) -> Result<CategoricalDistribution> {
        CategoricalDistribution::from_logits(self.linear.forward(features)?)
    }
}

/// `tanh` bounded mean plus a learnable `log_std` vector that does not see the features.
#[derive(Debug, Clone)]
pub struct DiagGaussianHead {
    fc_mean: Linear,
    log_std: Tensor,
}

impl DiagGaussianHead {
    pub fn build(
        input_dim: usize,
        action_size: usize,
        varmap: &VarMap,
        prefix: &str,
        device: &Device,
    ) -> Result<Self> {
        let fc_mean = orthogonal_linear(
            input_dim,
            action_size,
            MEAN_OUTPUT_GAIN,
            varmap,
            &format!("{prefix}.fc_mean"),
            device,
        )?;
        let log_std = Tensor::zeros(action_size, DType::F32, device)?;
        let log_std = register_var(varmap, format!("{prefix}.log_std"), &log_std)?;
        Ok(Self { fc_mean, log_std })
    }

    pub fn log_std(&self) -> &Tensor {
        &self.log_std
    }

    pub fn forward(&self, features: &Tensor) -> Result<DiagGaussianDistribution> {
        let mean = self.fc_mean.forward(features)?.tanh()?;
        // bias only transform of a zero input, so the width broadcasts over the batch
        let log_std = mean.zeros_like()?.broadcast_add(&self.log_std)?;
        DiagGaussianDistribution::new(mean, log_std)
    }
}

#[derive(Debug, Clone)]
pub struct BernoulliHead {
    linear: Linear,
}

impl BernoulliHead {
    pub fn build(
        input_dim: usize,
        action_size: usize,
        varmap: &VarMap,
        prefix: &str,
        device: &Device,
    ) -> Result<Self> {
        let linear = orthogonal_linear(
            input_dim,
            action_size,
            SMALL_OUTPUT_GAIN,
            varmap,
            &format!("{prefix}.linear"),
            device,
        )?;
        Ok(Self { linear })
    }

    pub fn forward(&self, features: &Tensor) -> Result<BernoulliDistribution> {
        BernoulliDistribution::from_logits(self.linear.forward(features)?)
    }
}

/// Maps shared features to the distribution matching the action space. The variant is fixed
/// when the head is built.
#[derive(Debug, Clone)]
pub enum ActionHead {
    Categorical(CategoricalHead),
    DiagGaussian(DiagGaussianHead),
    Bernoulli(BernoulliHead),
}

impl ActionHead {
    pub fn build(
        input_dim: usize,
        action_space: &Space,
        varmap: &VarMap,
        prefix: &str,
        device: &Device,
    ) -> Result<Self> {
        let action_size = action_space.size();
        if action_size == 0 {
            return Err(R2lError::InvalidSpace(format!(
                "empty action space {action_space:?}"
            )));
        }
        match action_space {
            Space::Discrete(n) => Ok(Self::Categorical(CategoricalHead::build(
                input_dim, *n, varmap, prefix, device,
            )?)),
            Space::Continous { size, .. } => Ok(Self::DiagGaussian(DiagGaussianHead::build(
                input_dim, *size, varmap, prefix, device,
            )?)),
            Space::MultiBinary(n) => Ok(Self::Bernoulli(BernoulliHead::build(
                input_dim, *n, varmap, prefix, device,
            )?)),
        }
    }

    pub fn forward(&self, features: &Tensor) -> Result<DistributionKind> {
        match self {
            Self::Categorical(head) => head.forward(features).map(Into::into),
            Self::DiagGaussian(head) => head.forward(features).map(Into::into),
            Self::Bernoulli(head) => head.forward(features).map(Into::into),
        }
    }
}

#[cfg(test)]
mod test {
    use super::ActionHead;
    use crate::{
        distributions::{Distribution, DistributionKind},
        env::Space,
        error::{R2lError, Result},
    };
    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarMap;

    fn features(batch_size: usize) -> Result<Tensor> {
        Ok(Tensor::randn(0f32, 1., (batch_size, 8), &Device::Cpu)?)
    }

    #[test]
    fn discrete_space_builds_categorical_close_to_uniform() -> Result<()> {
        let varmap = VarMap::new();
        let head = ActionHead::build(8, &Space::Discrete(4), &varmap, "dist", &Device::Cpu)?;
        let DistributionKind::Categorical(dist) = head.forward(&features(3)?)? else {
            panic!("expected a categorical distribution");
        };
        for row in dist.probs()?.to_vec2::<f32>()? {
            for p in row {
                assert!((p - 0.25).abs() < 0.02);
            }
        }
        assert_eq!(dist.sample()?.dims(), &[3, 1]);
        Ok(())
    }

    #[test]
    fn continuous_head_has_bounded_mean_and_shared_log_std() -> Result<()> {
        let varmap = VarMap::new();
        let space = Space::continous_from_dims(vec![3]);
        let head = ActionHead::build(8, &space, &varmap, "dist", &Device::Cpu)?;
        // fc_mean weight and bias plus log_std
        assert_eq!(varmap.all_vars().len(), 3);
        let features = (features(4)? * 50.)?;
        let DistributionKind::DiagGaussian(dist) = head.forward(&features)? else {
            panic!("expected a diagonal gaussian");
        };
        assert!(dist.mean().to_vec2::<f32>()?.iter().flatten().all(|m| m.abs() <= 1.));
        assert_eq!(dist.log_std().dims(), &[4, 3]);
        assert!(dist.log_std().to_vec2::<f32>()?.iter().flatten().all(|ls| *ls == 0.));
        // batch of one
        let single = head.forward(&Tensor::zeros((1, 8), DType::F32, &Device::Cpu)?)?;
        assert_eq!(single.log_probs(&single.mode()?)?.dims(), &[1, 1]);
        assert_eq!(single.entropy()?.dims(), &[1]);
        Ok(())
    }

    #[test]
    fn multi_binary_space_builds_bernoulli() -> Result<()> {
        let varmap = VarMap::new();
        let head = ActionHead::build(8, &Space::MultiBinary(5), &varmap, "dist", &Device::Cpu)?;
        let dist = head.forward(&features(2)?)?;
        assert!(matches!(dist, DistributionKind::Bernoulli(_)));
        let actions = dist.sample()?;
        assert_eq!(actions.dims(), &[2, 5]);
        assert_eq!(dist.log_probs(&actions)?.dims(), &[2, 1]);
        assert_eq!(dist.entropy()?.dims(), &[2]);
        Ok(())
    }

    #[test]
    fn empty_space_is_rejected() {
        let varmap = VarMap::new();
        let head = ActionHead::build(8, &Space::Discrete(0), &varmap, "dist", &Device::Cpu);
        assert!(matches!(head, Err(R2lError::InvalidSpace(_))));
    }
}
