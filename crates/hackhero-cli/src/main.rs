mod config;

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use serde_json::json;
use tracing::info;

use hackhero_auth::Accounts;
use hackhero_db::Database;

use crate::config::Config;

const USAGE: &str = "usage:
  hackhero create-admin        create an admin account (prompts for details)
  hackhero stats <username>    print a player's progress and statistics as JSON";

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hackhero=info,hackhero_db=info,hackhero_auth=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env();
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("create-admin") => {
            let db = open(&config)?;
            create_admin(&db)
        }
        Some("stats") => {
            let username = args.next().context(USAGE)?;
            let db = open(&config)?;
            print_stats(&db, &username)
        }
        _ => bail!(USAGE),
    }
}

fn open(config: &Config) -> anyhow::Result<Database> {
    Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))
}

/// Interactive admin provisioning: admins cannot sign themselves up.
fn create_admin(db: &Database) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let email = prompt(&mut input, "Enter email: ")?;
    let username = prompt(&mut input, "Enter username: ")?;
    let password = prompt(&mut input, "Enter password: ")?;

    let id = Accounts::default().register_admin(db, &username, &email, &password)?;

    info!("Admin '{}' provisioned", username);
    println!("Created admin '{}' with id {}", username, id);
    Ok(())
}

fn prompt(input: &mut impl BufRead, label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("unexpected end of input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_stats(db: &Database, username: &str) -> anyhow::Result<()> {
    let Some(user) = db.get_user_by_username(username)? else {
        bail!("no user named '{}'", username);
    };
    if db.is_admin(user.id)? {
        bail!("'{}' is an admin and has no player progress", username);
    }

    let report = json!({
        "username": user.username,
        "quests": {
            "in_progress": db.quests_in_progress(user.id)?,
            "completed": db.quests_completed(user.id)?,
            "available": db.quests_available(user.id)?,
        },
        "stats": db.player_stats(user.id)?,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
