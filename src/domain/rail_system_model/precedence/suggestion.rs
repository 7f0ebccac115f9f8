use serde::Serialize;

use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;

/// Blocks of one connected overlap window on a resource, in precedence order (winner first).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecedenceGroup {
    pub resource_id: ResourceId,
    pub window: TimeInterval,
    pub order: Vec<BlockId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SuggestedAction {
    /// Earliest conflict-free interval on the same resource.
    Shift { to: TimeInterval },

    /// No slot inside the horizon. Needs a manual decision.
    Unresolvable,
}

/// Proposed fix for one displaced block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub block_id: BlockId,
    pub train_id: TrainId,
    pub resource_id: ResourceId,

    /// Position of the block in its precedence group (0 is the winner, never displaced).
    pub rank: usize,
    pub current: TimeInterval,
    pub action: SuggestedAction,

    /// A compatible resource that is free over `current`, if any.
    pub alternative_resource: Option<ResourceId>,
}

impl Suggestion {
    pub fn is_unresolvable(&self) -> bool {
        self.action == SuggestedAction::Unresolvable
    }
}

/// Which part of a suggestion a caller accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionChoice {
    Shift,
    AlternativeResource,
}

/// Output of the precedence resolver for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub groups: Vec<PrecedenceGroup>,
    pub suggestions: Vec<Suggestion>,
}

impl Resolution {
    pub fn suggestion_for(&self, block_id: BlockId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|suggestion| suggestion.block_id == block_id)
    }

    pub fn unresolvable(&self) -> Vec<BlockId> {
        self.suggestions.iter().filter(|suggestion| suggestion.is_unresolvable()).map(|suggestion| suggestion.block_id).collect()
    }
}
