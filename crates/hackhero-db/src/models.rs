/// Database row types, mapping directly to SQLite rows.
/// Converted into hackhero-types records before leaving the crate.
use hackhero_types::models::{Problem, Quest, User};
use rusqlite::Row;
use uuid::Uuid;

use crate::error::{Result, StoreError};

pub struct UserRow {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub hash_pw: String,
}

impl UserRow {
    pub const COLUMNS: &'static str = "uid, username, email, hash_pw";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            hash_pw: row.get(3)?,
        })
    }

    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.uid)?,
            username: self.username,
            email: self.email,
        })
    }
}

pub struct QuestRow {
    pub qid: String,
    pub quest_name: String,
    pub uid: String,
}

impl QuestRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            qid: row.get(0)?,
            quest_name: row.get(1)?,
            uid: row.get(2)?,
        })
    }

    pub fn into_quest(self) -> Result<Quest> {
        Ok(Quest {
            id: parse_id(&self.qid)?,
            name: self.quest_name,
            owner_id: parse_id(&self.uid)?,
        })
    }
}

pub struct ProblemRow {
    pub pid: String,
    pub problem_link: String,
    pub difficulty: String,
}

impl ProblemRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            pid: row.get(0)?,
            problem_link: row.get(1)?,
            difficulty: row.get(2)?,
        })
    }

    pub fn into_problem(self, topics: Vec<String>) -> Result<Problem> {
        Ok(Problem {
            id: parse_id(&self.pid)?,
            link: self.problem_link,
            difficulty: self.difficulty,
            topics,
        })
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::CorruptRow(format!("bad identifier '{}': {}", raw, e)))
}
