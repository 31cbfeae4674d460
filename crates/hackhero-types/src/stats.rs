use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Difficulty label -> number of completion events.
pub type DifficultyCounts = BTreeMap<String, u64>;

/// Topic label -> difficulty label -> number of completion events.
///
/// A problem tagged with several topics is counted once under each of them.
pub type TopicDifficultyCounts = BTreeMap<String, DifficultyCounts>;

/// Everything shown on a player's statistics page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub per_difficulty: DifficultyCounts,
    pub per_topic: TopicDifficultyCounts,
    pub completed_today: u64,
    pub total_completed: u64,
}

impl PlayerStats {
    /// Sum over the per-difficulty view. Always equals `total_completed`.
    pub fn difficulty_total(&self) -> u64 {
        self.per_difficulty.values().sum()
    }
}
