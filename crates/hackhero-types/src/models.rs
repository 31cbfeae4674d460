use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account, without its credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Who is acting, as established by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

/// Role markers are mutually exclusive; an account in neither set has no role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: Uuid,
    pub name: String,
    /// UID of the authoring admin.
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub link: String,
    /// Free-form label such as "Easy" or "Hard". Not validated.
    pub difficulty: String,
    /// Sorted topic labels attached to this problem.
    pub topics: Vec<String>,
}

/// Input to quest authoring: one problem to create alongside the quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSpec {
    pub link: String,
    pub difficulty: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl ProblemSpec {
    pub fn new<I, S>(link: impl Into<String>, difficulty: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            link: link.into(),
            difficulty: difficulty.into(),
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }
}

/// A player's standing on a quest, derived from their PlayerQuests row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// No PlayerQuests row.
    Available,
    /// Row present, completion flag unset.
    InProgress,
    /// Row present, completion flag set.
    Completed,
}

impl QuestStatus {
    pub fn from_row(is_completed: Option<bool>) -> Self {
        match is_completed {
            None => Self::Available,
            Some(false) => Self::InProgress,
            Some(true) => Self::Completed,
        }
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// How far a player is through one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: Uuid,
    pub status: QuestStatus,
    /// Distinct quest problems with at least one completion.
    pub completed: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_row_presence_and_flag() {
        assert_eq!(QuestStatus::from_row(None), QuestStatus::Available);
        assert_eq!(QuestStatus::from_row(Some(false)), QuestStatus::InProgress);
        assert_eq!(QuestStatus::from_row(Some(true)), QuestStatus::Completed);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&QuestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(QuestStatus::InProgress.to_string(), "in progress");
    }

    #[test]
    fn problem_spec_topics_default_to_empty() {
        let spec: ProblemSpec =
            serde_json::from_str(r#"{"link":"https://x/1","difficulty":"Easy"}"#).unwrap();
        assert!(spec.topics.is_empty());
    }
}
