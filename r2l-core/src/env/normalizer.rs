use crate::{error::Result, utils::running_mean_std::RunningMeanStd};
use candle_core::{Device, Tensor};

pub trait ObsNormalizer {
    fn normalize_obs(&self, obs: &Tensor) -> Result<Tensor>;
}

/// Passes observations through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl ObsNormalizer for IdentityNormalizer {
    fn normalize_obs(&self, obs: &Tensor) -> Result<Tensor> {
        Ok(obs.clone())
    }
}

/// Standardizes observations with running statistics and clips the result.
#[derive(Debug, Clone)]
pub struct RunningObsNormalizer {
    pub obs_rms: RunningMeanStd,
    pub clip_obs: f32,
    pub epsilon: f32,
    pub training: bool,
}

impl RunningObsNormalizer {
    pub fn new(observation_size: usize, device: Device) -> Result<Self> {
        Ok(Self {
            obs_rms: RunningMeanStd::new(observation_size, device)?,
            clip_obs: 10.,
            epsilon: 1e-8,
            training: true,
        })
    }

    pub fn with_clip_obs(mut self, clip_obs: f32) -> Self {
        self.clip_obs = clip_obs;
        self
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Statistics only move while training, evaluation reads them frozen.
    pub fn update(&mut self, obs: &Tensor) -> Result<()> {
        if self.training {
            self.obs_rms.update(obs)?;
        }
        Ok(())
    }
}

impl ObsNormalizer for RunningObsNormalizer {
    fn normalize_obs(&self, obs: &Tensor) -> Result<Tensor> {
        let std = (&self.obs_rms.var + self.epsilon as f64)?.sqrt()?;
        let normalized = obs
            .broadcast_sub(&self.obs_rms.mean)?
            .broadcast_div(&std)?;
        let clip = self.clip_obs as f64;
        Ok(normalized.clamp(-clip, clip)?)
    }
}
