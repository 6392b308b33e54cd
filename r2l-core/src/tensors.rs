use crate::error::Result;
use candle_core::{DType, Device, Tensor};
use derive_more::{Deref, DerefMut, Display};

/// Per slot recurrent memory, shape (num_envs, hidden_size).
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct HiddenStates(pub Tensor);

impl HiddenStates {
    pub fn zeros(num_envs: usize, hidden_size: usize, device: &Device) -> Result<Self> {
        Ok(Self(Tensor::zeros(
            (num_envs, hidden_size),
            DType::F32,
            device,
        )?))
    }
}

/// Per slot episode mask, shape (num_envs, 1). A zero means the previous step ended an episode.
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct Masks(pub Tensor);

impl Masks {
    pub fn zeros(num_envs: usize, device: &Device) -> Result<Self> {
        Ok(Self(Tensor::zeros((num_envs, 1), DType::F32, device)?))
    }

    pub fn from_dones(dones: &[bool], device: &Device) -> Result<Self> {
        let masks: Vec<f32> = dones
            .iter()
            .map(|done| if *done { 0. } else { 1. })
            .collect();
        Ok(Self(Tensor::from_vec(masks, (dones.len(), 1), device)?))
    }
}

#[derive(Deref, DerefMut, Debug, Display)]
pub struct Logp(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct ValuesPred(pub Tensor);
