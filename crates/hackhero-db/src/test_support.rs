use chrono::NaiveDateTime;
use hackhero_types::models::ProblemSpec;
use std::sync::Arc;
use uuid::Uuid;

use crate::{Database, ManualClock};

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub struct Fixture {
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub admin: Uuid,
    pub player: Uuid,
    pub quest: Uuid,
    /// Easy, topics {arrays}
    pub easy: Uuid,
    /// Medium, topics {arrays, two-pointers}
    pub medium: Uuid,
}

/// An admin, a player and the "Arrays 101" quest with two problems.
pub fn arrays_101() -> Fixture {
    let clock = Arc::new(ManualClock::new(at("2026-10-17 09:00:00")));
    let db = Database::open_in_memory().unwrap().with_clock(clock.clone());

    let admin = Uuid::new_v4();
    db.register_admin(admin, "admin1", "admin1@example.com", "h").unwrap();
    let player = Uuid::new_v4();
    db.register_player(player, "ada", "ada@example.com", "h").unwrap();

    let quest = db
        .create_quest(
            admin,
            "Arrays 101",
            &[
                ProblemSpec::new("https://lc/1-two-sum", "Easy", ["arrays"]),
                ProblemSpec::new("https://lc/2-3sum", "Medium", ["arrays", "two-pointers"]),
            ],
        )
        .unwrap();
    let problems = db.quest_problems(quest).unwrap();
    let (easy, medium) = (problems[0].id, problems[1].id);

    Fixture { db, clock, admin, player, quest, easy, medium }
}
