use std::collections::BTreeMap;

use chrono::NaiveDate;
use hackhero_types::stats::{DifficultyCounts, PlayerStats, TopicDifficultyCounts};
use rusqlite::Connection;
use uuid::Uuid;

use crate::Database;
use crate::clock::{day_bounds, format_timestamp};
use crate::error::{Result, StoreError};

// Every view counts completion events, so repeated completions of one problem
// are counted once per row.

impl Database {
    pub fn problems_per_difficulty(&self, player: Uuid) -> Result<DifficultyCounts> {
        self.with_conn(|conn| per_difficulty(conn, &player.to_string()))
    }

    pub fn problems_per_topic(&self, player: Uuid) -> Result<TopicDifficultyCounts> {
        self.with_conn(|conn| per_topic(conn, &player.to_string()))
    }

    /// Completions stamped on the clock's current calendar day.
    pub fn problems_completed_today(&self, player: Uuid) -> Result<u64> {
        let today = self.clock.now().date();
        self.with_conn(|conn| completed_on(conn, &player.to_string(), today))
    }

    pub fn total_completions(&self, player: Uuid) -> Result<u64> {
        self.with_conn(|conn| total(conn, &player.to_string()))
    }

    /// Completion counts keyed by local calendar day.
    pub fn completions_per_day(&self, player: Uuid) -> Result<BTreeMap<NaiveDate, u64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT substr(completion_date, 1, 10) AS day, COUNT(*)
                 FROM completed_problems
                 WHERE uid = ?1
                 GROUP BY day",
            )?;
            let rows = stmt
                .query_map([player.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(day, n)| {
                    let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                        .map_err(|e| StoreError::CorruptRow(format!("bad date '{}': {}", day, e)))?;
                    Ok((date, n as u64))
                })
                .collect()
        })
    }

    /// All statistics views, read under one lock so they agree with each other.
    pub fn player_stats(&self, player: Uuid) -> Result<PlayerStats> {
        let uid = player.to_string();
        let today = self.clock.now().date();
        self.with_conn(|conn| {
            Ok(PlayerStats {
                per_difficulty: per_difficulty(conn, &uid)?,
                per_topic: per_topic(conn, &uid)?,
                completed_today: completed_on(conn, &uid, today)?,
                total_completed: total(conn, &uid)?,
            })
        })
    }
}

fn per_difficulty(conn: &Connection, uid: &str) -> Result<DifficultyCounts> {
    let mut stmt = conn.prepare(
        "SELECT p.difficulty, COUNT(*)
         FROM completed_problems cp
         JOIN problems p ON p.pid = cp.pid
         WHERE cp.uid = ?1
         GROUP BY p.difficulty",
    )?;
    let mut counts = DifficultyCounts::new();
    let mut rows = stmt.query([uid])?;
    while let Some(row) = rows.next()? {
        counts.insert(row.get(0)?, row.get::<_, i64>(1)? as u64);
    }
    Ok(counts)
}

fn per_topic(conn: &Connection, uid: &str) -> Result<TopicDifficultyCounts> {
    let mut stmt = conn.prepare(
        "SELECT pt.type, p.difficulty, COUNT(*)
         FROM completed_problems cp
         JOIN problems p ON p.pid = cp.pid
         JOIN problem_topics pt ON pt.pid = cp.pid
         WHERE cp.uid = ?1
         GROUP BY pt.type, p.difficulty",
    )?;
    let mut counts = TopicDifficultyCounts::new();
    let mut rows = stmt.query([uid])?;
    while let Some(row) = rows.next()? {
        counts
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?, row.get::<_, i64>(2)? as u64);
    }
    Ok(counts)
}

fn completed_on(conn: &Connection, uid: &str, day: NaiveDate) -> Result<u64> {
    let (start, end) = day_bounds(day);
    let (start, end) = (format_timestamp(start), format_timestamp(end));
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM completed_problems
         WHERE uid = ?1 AND completion_date >= ?2 AND completion_date < ?3",
        [uid, start.as_str(), end.as_str()],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

fn total(conn: &Connection, uid: &str) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM completed_problems WHERE uid = ?1",
        [uid],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}
