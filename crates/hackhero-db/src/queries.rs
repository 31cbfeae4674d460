use std::collections::HashMap;

use hackhero_types::models::{Problem, Quest, Role, User};
use rusqlite::{Connection, OptionalExtension, Params};
use tracing::info;
use uuid::Uuid;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{ProblemRow, QuestRow, UserRow};

impl Database {
    // -- Users --

    /// Create a user together with its Players row.
    pub fn register_player(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.register(Role::Player, id, username, email, password_hash)
    }

    /// Create a user together with its Admins row.
    pub fn register_admin(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.register(Role::Admin, id, username, email, password_hash)
    }

    fn register(
        &self,
        role: Role,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        if username.trim().is_empty() {
            return Err(StoreError::InvalidInput("username must not be empty"));
        }
        if email.trim().is_empty() {
            return Err(StoreError::InvalidInput("email must not be empty"));
        }

        let uid = id.to_string();
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (uid, username, email, hash_pw) VALUES (?1, ?2, ?3, ?4)",
                (&uid, username, email, password_hash),
            )?;
            let marker = match role {
                Role::Player => "INSERT INTO players (uid) VALUES (?1)",
                Role::Admin => "INSERT INTO admins (uid) VALUES (?1)",
            };
            tx.execute(marker, [&uid])?;
            Ok(())
        })?;

        info!("Registered {:?} '{}' ({})", role, username, uid);
        Ok(())
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "username", username)?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "uid", &id.to_string())?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    /// The stored credential hash, opaque to the store.
    pub fn credential_hash(&self, id: Uuid) -> Result<Option<String>> {
        self.with_conn(|conn| Ok(query_user(conn, "uid", &id.to_string())?.map(|u| u.hash_pw)))
    }

    pub fn is_admin(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "SELECT 1 FROM admins WHERE uid = ?1", [id.to_string()]))
    }

    /// Admin membership wins; otherwise a Players row makes the user a player.
    /// Unknown users have no role.
    pub fn role(&self, id: Uuid) -> Result<Option<Role>> {
        let uid = id.to_string();
        self.with_conn(|conn| {
            if exists(conn, "SELECT 1 FROM admins WHERE uid = ?1", [&uid])? {
                Ok(Some(Role::Admin))
            } else if exists(conn, "SELECT 1 FROM players WHERE uid = ?1", [&uid])? {
                Ok(Some(Role::Player))
            } else {
                Ok(None)
            }
        })
    }

    // -- Topics --

    /// Insert a topic label if it is not already present.
    pub fn ensure_topic(&self, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(StoreError::InvalidInput("topic must not be empty"));
        }
        self.with_conn(|conn| insert_topic(conn, label))
    }

    pub fn all_topics(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT type FROM topics ORDER BY type")?;
            let topics = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(topics)
        })
    }

    // -- Quests --

    pub fn get_quest(&self, id: Uuid) -> Result<Option<Quest>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT qid, quest_name, uid FROM quests WHERE qid = ?1",
                [id.to_string()],
                QuestRow::from_row,
            )
            .optional()?
            .map(QuestRow::into_quest)
            .transpose()
        })
    }

    /// Problems of a quest with their topic labels. Empty for unknown quests.
    pub fn quest_problems(&self, id: Uuid) -> Result<Vec<Problem>> {
        let qid = id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.pid, p.problem_link, p.difficulty
                 FROM problems p
                 JOIN quest_problems qp ON p.pid = qp.pid
                 WHERE qp.qid = ?1
                 ORDER BY p.problem_link, p.pid",
            )?;
            let rows = stmt
                .query_map([&qid], ProblemRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass for all topics of the quest instead of one query per problem
            let mut stmt = conn.prepare(
                "SELECT pt.pid, pt.type
                 FROM problem_topics pt
                 JOIN quest_problems qp ON pt.pid = qp.pid
                 WHERE qp.qid = ?1
                 ORDER BY pt.type",
            )?;
            let mut topics: HashMap<String, Vec<String>> = HashMap::new();
            let mut topic_rows = stmt.query([&qid])?;
            while let Some(row) = topic_rows.next()? {
                topics.entry(row.get(0)?).or_default().push(row.get(1)?);
            }

            rows.into_iter()
                .map(|row| {
                    let tags = topics.remove(&row.pid).unwrap_or_default();
                    row.into_problem(tags)
                })
                .collect()
        })
    }

    /// Quests authored by the given admin, ordered by name.
    pub fn quests_created_by(&self, owner: Uuid) -> Result<Vec<Quest>> {
        self.with_conn(|conn| {
            query_quests(
                conn,
                "SELECT qid, quest_name, uid FROM quests WHERE uid = ?1 ORDER BY quest_name, qid",
                [owner.to_string()],
            )
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of our own literals, never caller input
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", UserRow::COLUMNS, column);
    let row = conn
        .query_row(&sql, [value], UserRow::from_row)
        .optional()?;
    Ok(row)
}

pub(crate) fn query_quests<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Quest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, QuestRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(QuestRow::into_quest).collect()
}

pub(crate) fn insert_topic(conn: &Connection, label: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO topics (type) VALUES (?1) ON CONFLICT (type) DO NOTHING",
        [label],
    )?;
    Ok(())
}

pub(crate) fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<bool> {
    let found = conn
        .query_row(sql, params, |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}
