use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use hackhero_types::models::{Quest, QuestProgress, QuestStatus};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::clock::format_timestamp;
use crate::error::Result;
use crate::models::parse_id;
use crate::queries::{exists, query_quests};

impl Database {
    /// Record that a player has started a quest. Starting the same quest twice
    /// is a constraint violation and leaves the existing row untouched.
    pub fn start_quest(&self, player: Uuid, quest: Uuid) -> Result<()> {
        let (uid, qid) = (player.to_string(), quest.to_string());
        let completed = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO player_quests (uid, qid, is_completed) VALUES (?1, ?2, 0)",
                [&uid, &qid],
            )?;
            // Problems finished before the quest was started still count
            refresh_quest_completion(tx, &uid, &qid)
        })?;

        debug!("Player {} started quest {} (completed={})", uid, qid, completed);
        Ok(())
    }

    /// Append a completion event stamped with the current time. Repeated calls
    /// append further rows; membership in a started quest is not required.
    pub fn complete_problem(&self, player: Uuid, problem: Uuid) -> Result<NaiveDateTime> {
        let (uid, pid) = (player.to_string(), problem.to_string());
        let now = self.clock.now();
        let stamp = format_timestamp(now);

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO completed_problems (uid, pid, completion_date) VALUES (?1, ?2, ?3)",
                [&uid, &pid, &stamp],
            )?;
            refresh_quests_containing(tx, &uid, &pid)
        })?;

        debug!("Player {} completed problem {} at {}", uid, pid, stamp);
        Ok(now)
    }

    /// Remove every completion event for the pair. Returns how many were removed.
    pub fn uncomplete_problem(&self, player: Uuid, problem: Uuid) -> Result<usize> {
        let (uid, pid) = (player.to_string(), problem.to_string());
        let removed = self.with_tx(|tx| {
            let removed = tx.execute(
                "DELETE FROM completed_problems WHERE uid = ?1 AND pid = ?2",
                [&uid, &pid],
            )?;
            refresh_quests_containing(tx, &uid, &pid)?;
            Ok(removed)
        })?;

        debug!("Player {} uncompleted problem {} ({} rows)", uid, pid, removed);
        Ok(removed)
    }

    pub fn quest_status(&self, player: Uuid, quest: Uuid) -> Result<QuestStatus> {
        self.with_conn(|conn| query_status(conn, &player.to_string(), &quest.to_string()))
    }

    pub fn is_quest_started(&self, player: Uuid, quest: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            exists(
                conn,
                "SELECT 1 FROM player_quests WHERE uid = ?1 AND qid = ?2",
                [player.to_string(), quest.to_string()],
            )
        })
    }

    // -- Dashboard lists --

    pub fn quests_in_progress(&self, player: Uuid) -> Result<Vec<Quest>> {
        self.started_quests(player, false)
    }

    pub fn quests_completed(&self, player: Uuid) -> Result<Vec<Quest>> {
        self.started_quests(player, true)
    }

    fn started_quests(&self, player: Uuid, completed: bool) -> Result<Vec<Quest>> {
        self.with_conn(|conn| {
            query_quests(
                conn,
                "SELECT q.qid, q.quest_name, q.uid
                 FROM quests q
                 JOIN player_quests pq ON q.qid = pq.qid
                 WHERE pq.uid = ?1 AND pq.is_completed = ?2
                 ORDER BY q.quest_name, q.qid",
                (player.to_string(), completed),
            )
        })
    }

    /// Quests the player has not started.
    pub fn quests_available(&self, player: Uuid) -> Result<Vec<Quest>> {
        self.with_conn(|conn| {
            query_quests(
                conn,
                "SELECT q.qid, q.quest_name, q.uid
                 FROM quests q
                 WHERE NOT EXISTS (
                     SELECT 1 FROM player_quests pq
                     WHERE pq.uid = ?1 AND pq.qid = q.qid
                 )
                 ORDER BY q.quest_name, q.qid",
                [player.to_string()],
            )
        })
    }

    /// Distinct problems the player has at least one completion for.
    pub fn completed_problems(&self, player: Uuid) -> Result<BTreeSet<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT pid FROM completed_problems WHERE uid = ?1")?;
            let pids = stmt
                .query_map([player.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            pids.iter().map(|pid| parse_id(pid)).collect()
        })
    }

    /// Status plus completed/total problem counts. `None` for unknown quests.
    pub fn quest_progress(&self, player: Uuid, quest: Uuid) -> Result<Option<QuestProgress>> {
        let (uid, qid) = (player.to_string(), quest.to_string());
        self.with_conn(|conn| {
            if !exists(conn, "SELECT 1 FROM quests WHERE qid = ?1", [&qid])? {
                return Ok(None);
            }
            let (total, completed) = count_quest_problems(conn, &uid, &qid)?;
            Ok(Some(QuestProgress {
                quest_id: quest,
                status: query_status(conn, &uid, &qid)?,
                completed,
                total,
            }))
        })
    }
}

fn query_status(conn: &Connection, uid: &str, qid: &str) -> Result<QuestStatus> {
    let flag: Option<bool> = conn
        .query_row(
            "SELECT is_completed FROM player_quests WHERE uid = ?1 AND qid = ?2",
            [uid, qid],
            |row| row.get(0),
        )
        .optional()?;
    Ok(QuestStatus::from_row(flag))
}

/// (problems in quest, distinct quest problems completed by the player)
fn count_quest_problems(conn: &Connection, uid: &str, qid: &str) -> Result<(u64, u64)> {
    let (total, completed): (i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(EXISTS (
                    SELECT 1 FROM completed_problems cp
                    WHERE cp.uid = ?1 AND cp.pid = qp.pid
                )), 0)
         FROM quest_problems qp
         WHERE qp.qid = ?2",
        [uid, qid],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((total as u64, completed as u64))
}

/// Recompute the completion flag of one started quest: set iff the quest has
/// at least one problem and the player has completed all of them.
fn refresh_quest_completion(conn: &Connection, uid: &str, qid: &str) -> Result<bool> {
    let (total, completed) = count_quest_problems(conn, uid, qid)?;
    let is_completed = total > 0 && completed == total;
    conn.execute(
        "UPDATE player_quests SET is_completed = ?3 WHERE uid = ?1 AND qid = ?2",
        (uid, qid, is_completed),
    )?;
    Ok(is_completed)
}

/// Refresh every quest the player has started that contains `pid`.
fn refresh_quests_containing(conn: &Connection, uid: &str, pid: &str) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT pq.qid
         FROM player_quests pq
         JOIN quest_problems qp ON qp.qid = pq.qid
         WHERE pq.uid = ?1 AND qp.pid = ?2",
    )?;
    let quests = stmt
        .query_map([uid, pid], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for qid in quests {
        refresh_quest_completion(conn, uid, &qid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{arrays_101, at};
    use chrono::TimeDelta;
    use hackhero_types::models::ProblemSpec;

    fn completion_rows(db: &Database, player: Uuid, problem: Uuid) -> Vec<String> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT completion_date FROM completed_problems WHERE uid = ?1 AND pid = ?2",
            )?;
            let rows = stmt
                .query_map([player.to_string(), problem.to_string()], |r| r.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .unwrap()
    }

    #[test]
    fn status_moves_from_available_to_in_progress() {
        let f = arrays_101();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::Available);
        assert!(!f.db.is_quest_started(f.player, f.quest).unwrap());

        f.db.start_quest(f.player, f.quest).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::InProgress);
        assert!(f.db.is_quest_started(f.player, f.quest).unwrap());
    }

    #[test]
    fn starting_twice_is_rejected_without_duplicating() {
        let f = arrays_101();
        f.db.start_quest(f.player, f.quest).unwrap();
        let err = f.db.start_quest(f.player, f.quest).unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(f.db.quests_in_progress(f.player).unwrap().len(), 1);
    }

    #[test]
    fn starting_unknown_quest_is_rejected() {
        let f = arrays_101();
        let err = f.db.start_quest(f.player, Uuid::new_v4()).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn completing_every_problem_completes_the_quest() {
        let f = arrays_101();
        f.db.start_quest(f.player, f.quest).unwrap();

        f.db.complete_problem(f.player, f.easy).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::InProgress);

        f.db.complete_problem(f.player, f.medium).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::Completed);
        assert_eq!(f.db.quests_completed(f.player).unwrap()[0].id, f.quest);
        assert!(f.db.quests_in_progress(f.player).unwrap().is_empty());

        // Taking one back reopens it
        f.db.uncomplete_problem(f.player, f.easy).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::InProgress);
    }

    #[test]
    fn starting_after_finishing_all_problems_is_immediately_complete() {
        let f = arrays_101();
        f.db.complete_problem(f.player, f.easy).unwrap();
        f.db.complete_problem(f.player, f.medium).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::Available);

        f.db.start_quest(f.player, f.quest).unwrap();
        assert_eq!(f.db.quest_status(f.player, f.quest).unwrap(), QuestStatus::Completed);
    }

    #[test]
    fn quest_without_problems_never_completes() {
        let f = arrays_101();
        let empty = f.db.create_quest(f.admin, "Empty", &[]).unwrap();
        f.db.start_quest(f.player, empty).unwrap();
        assert_eq!(f.db.quest_status(f.player, empty).unwrap(), QuestStatus::InProgress);
    }

    #[test]
    fn completion_is_permissive_about_quest_membership() {
        let f = arrays_101();
        f.db.complete_problem(f.player, f.easy).unwrap();
        assert!(f.db.completed_problems(f.player).unwrap().contains(&f.easy));
    }

    #[test]
    fn completing_unknown_problem_is_rejected() {
        let f = arrays_101();
        let err = f.db.complete_problem(f.player, Uuid::new_v4()).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn uncomplete_removes_every_duplicate() {
        let f = arrays_101();
        f.db.complete_problem(f.player, f.easy).unwrap();
        f.clock.advance(TimeDelta::minutes(5));
        f.db.complete_problem(f.player, f.easy).unwrap();
        f.clock.advance(TimeDelta::minutes(5));
        f.db.complete_problem(f.player, f.easy).unwrap();
        assert_eq!(completion_rows(&f.db, f.player, f.easy).len(), 3);

        assert_eq!(f.db.uncomplete_problem(f.player, f.easy).unwrap(), 3);
        assert!(completion_rows(&f.db, f.player, f.easy).is_empty());

        f.clock.set(at("2026-10-18 07:15:00"));
        let stamped = f.db.complete_problem(f.player, f.easy).unwrap();
        assert_eq!(stamped, at("2026-10-18 07:15:00"));
        assert_eq!(
            completion_rows(&f.db, f.player, f.easy),
            vec![format_timestamp(at("2026-10-18 07:15:00"))]
        );
    }

    #[test]
    fn uncomplete_without_rows_is_a_no_op() {
        let f = arrays_101();
        assert_eq!(f.db.uncomplete_problem(f.player, f.easy).unwrap(), 0);
    }

    #[test]
    fn dashboard_lists_partition_all_quests() {
        let f = arrays_101();
        let graphs = f
            .db
            .create_quest(f.admin, "Graphs", &[ProblemSpec::new("g", "Hard", ["graphs"])])
            .unwrap();
        let basics = f
            .db
            .create_quest(f.admin, "Basics", &[ProblemSpec::new("b", "Easy", ["math"])])
            .unwrap();
        let basics_pid = f.db.quest_problems(basics).unwrap()[0].id;

        f.db.start_quest(f.player, f.quest).unwrap();
        f.db.start_quest(f.player, basics).unwrap();
        f.db.complete_problem(f.player, basics_pid).unwrap();

        let ids = |quests: Vec<Quest>| quests.into_iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids(f.db.quests_in_progress(f.player).unwrap()), vec![f.quest]);
        assert_eq!(ids(f.db.quests_completed(f.player).unwrap()), vec![basics]);
        assert_eq!(ids(f.db.quests_available(f.player).unwrap()), vec![graphs]);
    }

    #[test]
    fn progress_counts_distinct_problems() {
        let f = arrays_101();
        assert_eq!(f.db.quest_progress(f.player, Uuid::new_v4()).unwrap(), None);

        f.db.start_quest(f.player, f.quest).unwrap();
        f.db.complete_problem(f.player, f.medium).unwrap();
        f.db.complete_problem(f.player, f.medium).unwrap();

        let progress = f.db.quest_progress(f.player, f.quest).unwrap().unwrap();
        assert_eq!(progress.status, QuestStatus::InProgress);
        assert_eq!((progress.completed, progress.total), (1, 2));
    }

    #[test]
    fn players_do_not_share_progress() {
        let f = arrays_101();
        let other = Uuid::new_v4();
        f.db.register_player(other, "grace", "grace@example.com", "h").unwrap();

        f.db.start_quest(f.player, f.quest).unwrap();
        f.db.complete_problem(f.player, f.easy).unwrap();

        assert_eq!(f.db.quest_status(other, f.quest).unwrap(), QuestStatus::Available);
        assert!(f.db.completed_problems(other).unwrap().is_empty());
    }
}
