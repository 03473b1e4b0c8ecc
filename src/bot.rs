//! One automated actor: an account identity plus an ordered behaviour set.

use std::sync::Arc;

use alloy::primitives::Address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::behaviour::Behaviour;
use crate::contract::TargetContract;
use crate::context::Context;
use crate::error::{Result, SwarmError};
use crate::outcome::Outcome;
use crate::solver::SolutionProvider;

pub struct Bot {
    account: Address,
    behaviours: Vec<Behaviour>,
    rng: StdRng,
}

impl Bot {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            behaviours: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Convenience constructor used by the driver: one behaviour per label,
    /// in configuration order.
    pub fn with_behaviours(
        account: Address,
        labels: &[String],
        solver: &Arc<dyn SolutionProvider>,
    ) -> Self {
        let mut bot = Self::new(account);
        for label in labels {
            bot.add_behaviour(label, Arc::clone(solver));
        }
        bot
    }

    pub fn add_behaviour(&mut self, label: &str, solver: Arc<dyn SolutionProvider>) {
        self.behaviours.push(Behaviour::from_label(label, solver));
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn behaviour_labels(&self) -> Vec<&'static str> {
        self.behaviours.iter().map(Behaviour::label).collect()
    }

    /// Pick one behaviour uniformly (not round-robin) and delegate.
    pub async fn perform_action(
        &mut self,
        target: &TargetContract,
        ctx: &Context,
    ) -> Result<Outcome> {
        if self.behaviours.is_empty() {
            return Err(SwarmError::EmptyBehaviourSet);
        }
        let index = self.rng.gen_range(0..self.behaviours.len());
        self.behaviours[index]
            .perform_action(self.account, target, ctx)
            .await
    }
}
