//! Message group id assignment
//!
//! Walks the strategy chain in priority order and writes the first
//! supporting strategy's id into the interaction context.

use super::strategy::GroupKeyStrategy;
use crate::domain::{InteractionContext, UNKNOWN_MESSAGE_GROUP_ID};

/// Assigns message group ids to interactions
///
/// Stateless apart from the chain itself, so one instance can be shared by
/// every connection task.
#[derive(Debug, Clone)]
pub struct MessageGroupService {
    strategies: Vec<GroupKeyStrategy>,
}

impl MessageGroupService {
    /// Creates a service using the default chain (MLLP, TCP, tenant, IP/port)
    pub fn new() -> Self {
        Self {
            strategies: GroupKeyStrategy::DEFAULT_CHAIN.to_vec(),
        }
    }

    /// Creates a service with a custom chain
    ///
    /// The IP/port fallback is appended when missing so that every context
    /// still receives a group id.
    pub fn with_strategies(mut strategies: Vec<GroupKeyStrategy>) -> Self {
        if !strategies.contains(&GroupKeyStrategy::IpPortFallback) {
            strategies.push(GroupKeyStrategy::IpPortFallback);
        }
        Self { strategies }
    }

    /// Returns the chain in evaluation order
    pub fn strategies(&self) -> &[GroupKeyStrategy] {
        &self.strategies
    }

    /// Computes the group id without touching the context
    pub fn resolve(&self, ctx: &InteractionContext) -> (GroupKeyStrategy, String) {
        self.strategies
            .iter()
            .find(|strategy| strategy.supports(ctx))
            .map(|strategy| (*strategy, strategy.create_group_id(ctx)))
            .unwrap_or_else(|| {
                (
                    GroupKeyStrategy::IpPortFallback,
                    UNKNOWN_MESSAGE_GROUP_ID.to_string(),
                )
            })
    }

    /// Computes the group id and stores it in the context
    ///
    /// If the context already carries a group id, that id is kept and
    /// returned unchanged.
    pub fn assign(&self, ctx: &mut InteractionContext) -> String {
        if let Some(existing) = ctx.message_group_id() {
            tracing::warn!(
                interaction_id = %ctx.interaction_id(),
                message_group_id = existing,
                "Message group id already assigned; keeping existing value"
            );
            return existing.to_string();
        }

        let (strategy, group_id) = self.resolve(ctx);
        crate::log_group_assigned!(ctx.interaction_id(), strategy, &group_id);

        if let Err(e) = ctx.set_message_group_id(group_id.clone()) {
            tracing::warn!(error = %e, "Failed to store message group id");
        }
        group_id
    }
}

impl Default for MessageGroupService {
    fn default() -> Self {
        Self::new()
    }
}
