use super::{Distribution, check_rank2, check_shape};
use crate::{error::Result, rng::randn};
use candle_core::{D, Tensor};
use std::f32::consts::PI;

/// Independent normal per action dimension. `mean` and `log_std` are both (B, A); the head
/// broadcasts its state independent `log_std` over the batch before building this.
#[derive(Debug, Clone)]
pub struct DiagGaussianDistribution {
    mean: Tensor,
    log_std: Tensor,
}

impl DiagGaussianDistribution {
    pub fn new(mean: Tensor, log_std: Tensor) -> Result<Self> {
        check_rank2("diag gaussian", &mean)?;
        check_shape("diag gaussian log_std", &log_std, mean.dims())?;
        Ok(Self { mean, log_std })
    }

    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    pub fn log_std(&self) -> &Tensor {
        &self.log_std
    }

    pub fn std(&self) -> Result<Tensor> {
        Ok(self.log_std.exp()?)
    }
}

impl Distribution for DiagGaussianDistribution {
    fn sample(&self) -> Result<Tensor> {
        let noise = randn(self.mean.shape(), self.mean.device())?;
        let std = self.log_std.detach().exp()?;
        let action = (self.mean.detach() + noise.mul(&std)?)?;
        Ok(action)
    }

    fn log_probs(&self, actions: &Tensor) -> Result<Tensor> {
        check_shape("diag gaussian log_probs", actions, self.mean.dims())?;
        let var = (&self.log_std * 2.)?.exp()?;
        let log_sqrt_2pi = (2f32 * PI).sqrt().ln() as f64;
        let log_probs = (((actions - &self.mean)?.sqr()? / (var * 2.)?)?.neg()?
            - &self.log_std)?;
        let log_probs = (log_probs - log_sqrt_2pi)?;
        Ok(log_probs.sum_keepdim(D::Minus1)?)
    }

    // Depends on log_std only, the mean never enters.
    fn entropy(&self) -> Result<Tensor> {
        let half_log_2pi_plus_half = 0.5 + 0.5 * (2. * PI).ln();
        let entropy = (&self.log_std + half_log_2pi_plus_half as f64)?;
        Ok(entropy.sum(D::Minus1)?)
    }

    fn mode(&self) -> Result<Tensor> {
        Ok(self.mean.clone())
    }
}

#[cfg(test)]
mod test {
    use super::DiagGaussianDistribution;
    use crate::{
        distributions::Distribution,
        error::{R2lError, Result},
        rng::set_seed,
    };
    use candle_core::{Device, Tensor};
    use std::f32::consts::PI;

    fn log_std() -> Result<Tensor> {
        Ok(Tensor::new(&[[-0.5f32, 0.0, 0.3], [-0.5, 0.0, 0.3]], &Device::Cpu)?)
    }

    fn reference_log_prob(actions: &[f32], mean: &[f32], log_std: &[f32]) -> f32 {
        actions
            .iter()
            .zip(mean)
            .zip(log_std)
            .map(|((a, m), ls)| {
                let var = (2. * ls).exp();
                -(a - m).powi(2) / (2. * var) - ls - (2. * PI).sqrt().ln()
            })
            .sum()
    }

    #[test]
    fn log_probs_sum_over_action_dims() -> Result<()> {
        let mean = Tensor::new(&[[0.1f32, -0.2, 0.9], [0.0, 0.0, 0.0]], &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean, log_std()?)?;
        let actions = Tensor::new(&[[0.3f32, 0.1, -0.4], [1.0, -1.0, 0.5]], &Device::Cpu)?;
        let log_probs = dist.log_probs(&actions)?;
        assert_eq!(log_probs.dims(), &[2, 1]);
        let log_probs = log_probs.to_vec2::<f32>()?;
        let ls = [-0.5f32, 0.0, 0.3];
        let expected_0 = reference_log_prob(&[0.3, 0.1, -0.4], &[0.1, -0.2, 0.9], &ls);
        let expected_1 = reference_log_prob(&[1.0, -1.0, 0.5], &[0.0, 0.0, 0.0], &ls);
        assert!((log_probs[0][0] - expected_0).abs() < 1e-5);
        assert!((log_probs[1][0] - expected_1).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn log_probs_rejects_mismatched_action_dim() -> Result<()> {
        let mean = Tensor::zeros((2, 3), candle_core::DType::F32, &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean, log_std()?)?;
        let actions = Tensor::zeros((2, 2), candle_core::DType::F32, &Device::Cpu)?;
        assert!(matches!(
            dist.log_probs(&actions),
            Err(R2lError::ShapeMismatch { .. })
        ));
        let actions = Tensor::zeros((1, 3), candle_core::DType::F32, &Device::Cpu)?;
        assert!(matches!(
            dist.log_probs(&actions),
            Err(R2lError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn entropy_matches_closed_form_and_ignores_mean() -> Result<()> {
        let expected: f32 = [-0.5f32, 0.0, 0.3]
            .iter()
            .map(|ls| 0.5 + 0.5 * (2. * PI).ln() + ls)
            .sum();
        for shift in [-3f32, 0., 0.7, 5.] {
            let mean = (Tensor::ones((2, 3), candle_core::DType::F32, &Device::Cpu)? * shift as f64)?;
            let dist = DiagGaussianDistribution::new(mean, log_std()?)?;
            let entropy = dist.entropy()?;
            assert_eq!(entropy.dims(), &[2]);
            for value in entropy.to_vec1::<f32>()? {
                assert!((value - expected).abs() < 1e-5);
            }
        }
        Ok(())
    }

    #[test]
    fn mode_is_the_mean() -> Result<()> {
        let mean = Tensor::new(&[[0.25f32, -0.75, 0.5]], &Device::Cpu)?;
        let log_std = Tensor::new(&[[0.1f32, 0.2, 0.3]], &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean.clone(), log_std)?;
        assert_eq!(dist.mode()?.to_vec2::<f32>()?, mean.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn sampled_actions_round_trip_through_log_probs() -> Result<()> {
        let mean_values = [0.2f32, -0.4, 0.6];
        let mean = Tensor::new(&[mean_values], &Device::Cpu)?;
        let log_std = Tensor::new(&[[-0.5f32, 0.0, 0.3]], &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean, log_std)?;
        let actions = dist.sample()?;
        assert_eq!(actions.dims(), &[1, 3]);
        let sampled = actions.to_vec2::<f32>()?;
        let expected = reference_log_prob(&sampled[0], &mean_values, &[-0.5, 0.0, 0.3]);
        let log_probs = dist.log_probs(&actions)?.to_vec2::<f32>()?;
        assert!((log_probs[0][0] - expected).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn seeded_sampling_is_reproducible() -> Result<()> {
        let mean = Tensor::new(&[[0.1f32, -0.3, 0.0, 0.8]], &Device::Cpu)?;
        let log_std = Tensor::new(&[[0.0f32, -1.0, 0.5, 0.2]], &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean, log_std)?;
        set_seed(3);
        let first = dist.sample()?.to_vec2::<f32>()?;
        set_seed(3);
        let second = dist.sample()?.to_vec2::<f32>()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn non_positive_scale_surfaces_as_non_finite() -> Result<()> {
        let mean = Tensor::new(&[[0f32]], &Device::Cpu)?;
        let log_std = Tensor::new(&[[f32::NEG_INFINITY]], &Device::Cpu)?;
        let dist = DiagGaussianDistribution::new(mean, log_std)?;
        let actions = Tensor::new(&[[1f32]], &Device::Cpu)?;
        let log_probs = dist.log_probs(&actions)?.to_vec2::<f32>()?;
        assert!(!log_probs[0][0].is_finite());
        Ok(())
    }
}
