pub mod action_head;
pub mod actor_critic;

use crate::{
    error::Result,
    tensors::{HiddenStates, Logp, Masks, ValuesPred},
};
use candle_core::Tensor;

/// Everything a policy produces for one batched step.
#[derive(Debug)]
pub struct PolicyStep {
    pub value: ValuesPred,
    pub action: Tensor,
    pub action_log_probs: Logp,
    pub recurrent_hidden_states: HiddenStates,
}

/// The narrow interface rollouts and evaluation consume.
pub trait Policy {
    /// Width of the per slot recurrent state. Feed forward policies report 1.
    fn recurrent_hidden_state_size(&self) -> usize;

    /// `masks` zero the recurrent state of slots whose previous step ended an episode.
    /// With `deterministic` the distribution mode is returned instead of a sample.
    fn act(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
        deterministic: bool,
    ) -> Result<PolicyStep>;
}
