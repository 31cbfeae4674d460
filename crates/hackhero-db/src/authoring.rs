use std::collections::BTreeSet;

use hackhero_types::models::ProblemSpec;
use tracing::info;
use uuid::Uuid;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::queries::insert_topic;

impl Database {
    /// Create a quest with all of its problems and topic tags as one atomic
    /// unit. On any failure nothing written by this call survives.
    pub fn create_quest(&self, owner: Uuid, name: &str, problems: &[ProblemSpec]) -> Result<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("quest name must not be empty"));
        }
        if problems.iter().any(|p| p.link.trim().is_empty()) {
            return Err(StoreError::InvalidInput("problem link must not be empty"));
        }

        let quest_id = self.ids.next_id();
        let qid = quest_id.to_string();

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO quests (qid, quest_name, uid) VALUES (?1, ?2, ?3)",
                (&qid, name, owner.to_string()),
            )?;

            for spec in problems {
                let pid = self.ids.next_id().to_string();
                tx.execute(
                    "INSERT INTO problems (pid, problem_link, difficulty) VALUES (?1, ?2, ?3)",
                    (&pid, spec.link.trim(), spec.difficulty.trim()),
                )?;
                tx.execute(
                    "INSERT INTO quest_problems (qid, pid) VALUES (?1, ?2)",
                    [&qid, &pid],
                )?;

                for topic in topic_labels(&spec.topics) {
                    insert_topic(tx, topic)?;
                    tx.execute(
                        "INSERT INTO problem_topics (pid, type) VALUES (?1, ?2)",
                        (&pid, topic),
                    )?;
                }
            }
            Ok(())
        })?;

        info!("Quest '{}' ({}) created with {} problems", name, qid, problems.len());
        Ok(quest_id)
    }
}

/// Trimmed, non-empty, de-duplicated labels.
fn topic_labels(topics: &[String]) -> BTreeSet<&str> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect()
}
