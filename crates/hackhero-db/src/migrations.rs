use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

const MIGRATIONS: &[(i64, &str, &str)] = &[(1, "initial schema", V1_INITIAL_SCHEMA)];

const V1_INITIAL_SCHEMA: &str = "
    CREATE TABLE users (
        uid         TEXT PRIMARY KEY,
        username    TEXT NOT NULL UNIQUE,
        email       TEXT NOT NULL UNIQUE,
        hash_pw     TEXT NOT NULL
    );

    CREATE TABLE players (
        uid         TEXT PRIMARY KEY REFERENCES users(uid)
    );

    CREATE TABLE admins (
        uid         TEXT PRIMARY KEY REFERENCES users(uid)
    );

    CREATE TABLE quests (
        qid         TEXT PRIMARY KEY,
        quest_name  TEXT NOT NULL,
        uid         TEXT NOT NULL REFERENCES users(uid)
    );

    CREATE INDEX idx_quests_owner ON quests(uid);

    CREATE TABLE problems (
        pid             TEXT PRIMARY KEY,
        problem_link    TEXT NOT NULL,
        difficulty      TEXT NOT NULL
    );

    CREATE TABLE quest_problems (
        qid         TEXT NOT NULL REFERENCES quests(qid),
        pid         TEXT NOT NULL REFERENCES problems(pid),
        PRIMARY KEY (qid, pid)
    );

    CREATE INDEX idx_quest_problems_pid ON quest_problems(pid);

    CREATE TABLE topics (
        type        TEXT PRIMARY KEY
    );

    CREATE TABLE problem_topics (
        pid         TEXT NOT NULL REFERENCES problems(pid),
        type        TEXT NOT NULL REFERENCES topics(type),
        PRIMARY KEY (pid, type)
    );

    CREATE TABLE player_quests (
        uid             TEXT NOT NULL REFERENCES players(uid),
        qid             TEXT NOT NULL REFERENCES quests(qid),
        is_completed    INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
        PRIMARY KEY (uid, qid)
    );

    -- Append-only event log: one row per completion, duplicates allowed
    CREATE TABLE completed_problems (
        uid             TEXT NOT NULL REFERENCES players(uid),
        pid             TEXT NOT NULL REFERENCES problems(pid),
        completion_date TEXT NOT NULL
    );

    CREATE INDEX idx_completed_problems_player
        ON completed_problems(uid, pid);

    CREATE INDEX idx_completed_problems_date
        ON completed_problems(uid, completion_date);
";

/// Bring the schema up to the latest version. Each step is applied in its own
/// transaction together with its `schema_version` row.
pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    for &(version, name, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        info!("Running migration v{} ({})", version, name);
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, MIGRATIONS.len() as i64);
    }
}
