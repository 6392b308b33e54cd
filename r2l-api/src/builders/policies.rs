use super::distribution::DistributionType;
use anyhow::Result;
use candle_core::Device;
use candle_nn::VarMap;
use r2l_core::{env::EnvironmentDescription, policies::actor_critic::ActorCritic};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ActorCriticBuilder {
    pub hidden_size: usize,
    pub recurrent: bool,
    pub distribution_type: DistributionType,
}

impl Default for ActorCriticBuilder {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            recurrent: false,
            distribution_type: DistributionType::Dynamic,
        }
    }
}

impl ActorCriticBuilder {
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_recurrent(mut self, recurrent: bool) -> Self {
        self.recurrent = recurrent;
        self
    }

    pub fn with_distribution_type(mut self, distribution_type: DistributionType) -> Self {
        self.distribution_type = distribution_type;
        self
    }

    /// Builds the policy together with the `VarMap` holding every trainable parameter, ready
    /// to be handed to an optimizer.
    pub fn build(
        &self,
        env_description: &EnvironmentDescription,
        device: &Device,
    ) -> Result<(ActorCritic, VarMap)> {
        anyhow::ensure!(self.hidden_size > 0, "hidden_size must be positive");
        let varmap = VarMap::new();
        let action_space = self.distribution_type.action_space(env_description);
        let policy = ActorCritic::build(
            env_description.observation_size(),
            &action_space,
            self.hidden_size,
            self.recurrent,
            &varmap,
            device,
        )?;
        debug!(
            hidden_size = self.hidden_size,
            recurrent = self.recurrent,
            distribution_type = ?self.distribution_type,
            "built actor critic"
        );
        Ok((policy, varmap))
    }
}
