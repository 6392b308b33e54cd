use super::{Policy, PolicyStep, action_head::ActionHead};
use crate::{
    distributions::{Distribution, DistributionKind},
    distributions::check_shape,
    env::Space,
    error::Result,
    tensors::{HiddenStates, Logp, Masks, ValuesPred},
    utils::{
        build_sequential::{TanhMlp, build_sequential},
        orthogonal::orthogonal_linear,
    },
};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{
    Linear, VarBuilder, VarMap,
    rnn::{GRU, GRUConfig, GRUState, RNN, gru},
};
use std::fmt::Debug;

const HIDDEN_GAIN: f64 = std::f64::consts::SQRT_2;

/// Separate actor and critic trunks over an optional GRU core, followed by a value output and
/// an action head.
pub struct ActorCritic {
    gru: Option<GRU>,
    actor: TanhMlp,
    critic: TanhMlp,
    critic_linear: Linear,
    action_head: ActionHead,
    observation_size: usize,
    hidden_size: usize,
}

impl Debug for ActorCritic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorCritic")
            .field("recurrent", &self.is_recurrent())
            .field("observation_size", &self.observation_size)
            .field("hidden_size", &self.hidden_size)
            .field("action_head", &self.action_head)
            .finish()
    }
}

impl ActorCritic {
    pub fn build(
        observation_size: usize,
        action_space: &Space,
        hidden_size: usize,
        recurrent: bool,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let (gru, trunk_input) = if recurrent {
            let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
            let core = gru(
                observation_size,
                hidden_size,
                GRUConfig::default(),
                vb.pp("base.gru"),
            )?;
            (Some(core), hidden_size)
        } else {
            (None, observation_size)
        };
        let layers = [hidden_size, hidden_size];
        let actor = build_sequential(
            trunk_input,
            &layers,
            HIDDEN_GAIN,
            varmap,
            "base.actor",
            device,
        )?;
        let critic = build_sequential(
            trunk_input,
            &layers,
            HIDDEN_GAIN,
            varmap,
            "base.critic",
            device,
        )?;
        let critic_linear =
            orthogonal_linear(hidden_size, 1, 1., varmap, "base.critic_linear", device)?;
        let action_head = ActionHead::build(hidden_size, action_space, varmap, "dist", device)?;
        Ok(Self {
            gru,
            actor,
            critic,
            critic_linear,
            action_head,
            observation_size,
            hidden_size,
        })
    }

    pub fn is_recurrent(&self) -> bool {
        self.gru.is_some()
    }

    pub fn action_head(&self) -> &ActionHead {
        &self.action_head
    }

    fn check_inputs(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
    ) -> Result<()> {
        let batch_size = observations.dim(0)?;
        check_shape(
            "actor critic observations",
            observations,
            &[batch_size, self.observation_size],
        )?;
        check_shape(
            "actor critic hidden states",
            recurrent_hidden_states,
            &[batch_size, self.recurrent_hidden_state_size()],
        )?;
        check_shape("actor critic masks", masks, &[batch_size, 1])
    }

    /// Returns the value estimate, the actor features and the next recurrent state.
    fn base_forward(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
    ) -> Result<(Tensor, Tensor, HiddenStates)> {
        self.check_inputs(observations, recurrent_hidden_states, masks)?;
        let (trunk_input, hxs) = match &self.gru {
            Some(core) => {
                let h = recurrent_hidden_states.broadcast_mul(masks)?;
                let state = core.step(observations, &GRUState { h })?;
                (state.h.clone(), HiddenStates(state.h))
            }
            None => (observations.clone(), recurrent_hidden_states.clone()),
        };
        let hidden_critic = self.critic.forward(&trunk_input)?;
        let hidden_actor = self.actor.forward(&trunk_input)?;
        let value = self.critic_linear.forward(&hidden_critic)?;
        Ok((value, hidden_actor, hxs))
    }

    pub fn distribution(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
    ) -> Result<DistributionKind> {
        let (_, actor_features, _) =
            self.base_forward(observations, recurrent_hidden_states, masks)?;
        self.action_head.forward(&actor_features)
    }

    pub fn get_value(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
    ) -> Result<ValuesPred> {
        let (value, _, _) = self.base_forward(observations, recurrent_hidden_states, masks)?;
        Ok(ValuesPred(value))
    }

    /// Returns values, log probs of `actions`, the batch mean entropy and the next recurrent
    /// state, the quantities the policy gradient objective is built from.
    pub fn evaluate_actions(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
        actions: &Tensor,
    ) -> Result<(ValuesPred, Logp, Tensor, HiddenStates)> {
        let (value, actor_features, hxs) =
            self.base_forward(observations, recurrent_hidden_states, masks)?;
        let dist = self.action_head.forward(&actor_features)?;
        let action_log_probs = dist.log_probs(actions)?;
        let dist_entropy = dist.entropy()?.mean_all()?;
        Ok((ValuesPred(value), Logp(action_log_probs), dist_entropy, hxs))
    }
}

impl Policy for ActorCritic {
    fn recurrent_hidden_state_size(&self) -> usize {
        if self.is_recurrent() {
            self.hidden_size
        } else {
            1
        }
    }

    fn act(
        &self,
        observations: &Tensor,
        recurrent_hidden_states: &HiddenStates,
        masks: &Masks,
        deterministic: bool,
    ) -> Result<PolicyStep> {
        let (value, actor_features, hxs) =
            self.base_forward(observations, recurrent_hidden_states, masks)?;
        let dist = self.action_head.forward(&actor_features)?;
        let action = if deterministic {
            dist.mode()?
        } else {
            dist.sample()?
        };
        let action_log_probs = dist.log_probs(&action)?;
        Ok(PolicyStep {
            value: ValuesPred(value),
            action,
            action_log_probs: Logp(action_log_probs),
            recurrent_hidden_states: hxs,
        })
    }
}
