use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use r2l_core::{
    env::{Env, EnvironmentDescription, SnapShot, Space},
    error::Result as CoreResult,
};
use std::{cell::Cell, rc::Rc};

/// Episodes last exactly `episode_len` steps and pay `reward` every step. The observation is
/// the elapsed fraction of the episode repeated `observation_size` times.
pub struct CountdownEnv {
    pub episode_len: usize,
    pub reward: f32,
    pub observation_size: usize,
    pub action_space: Space,
    pub renders: Rc<Cell<usize>>,
    pub fail_render: bool,
    t: usize,
    device: Device,
}

impl CountdownEnv {
    pub fn new(episode_len: usize, action_space: Space, device: &Device) -> Self {
        Self {
            episode_len,
            reward: 1.,
            observation_size: 3,
            action_space,
            renders: Rc::new(Cell::new(0)),
            fail_render: false,
            t: 0,
            device: device.clone(),
        }
    }

    fn observation(&self) -> CoreResult<Tensor> {
        let progress = self.t as f64 / self.episode_len as f64;
        Ok((Tensor::ones(self.observation_size, DType::F32, &self.device)? * progress)?)
    }
}

impl Env for CountdownEnv {
    fn reset(&mut self, _seed: u64) -> CoreResult<Tensor> {
        self.t = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> CoreResult<SnapShot> {
        let expected = match self.action_space {
            Space::Discrete(_) => 1,
            _ => self.action_space.size(),
        };
        let got = action.elem_count();
        if got != expected {
            return Err(r2l_core::error::R2lError::shape_mismatch(
                "countdown env action",
                &[expected],
                action.dims(),
            ));
        }
        self.t += 1;
        let terminated = self.t >= self.episode_len;
        Ok(SnapShot {
            state: self.observation()?,
            reward: self.reward,
            terminated,
            trancuated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![self.observation_size]),
            self.action_space.clone(),
        )
    }

    fn render(&mut self) -> CoreResult<()> {
        self.renders.set(self.renders.get() + 1);
        if self.fail_render {
            return Err(candle_core::Error::Msg("no display".into()).into());
        }
        Ok(())
    }
}

pub fn countdown_env_builder(
    episode_len: usize,
    action_space: Space,
) -> impl Fn(&Device) -> Result<CountdownEnv> {
    move |device| Ok(CountdownEnv::new(episode_len, action_space.clone(), device))
}
