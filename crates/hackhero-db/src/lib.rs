pub mod authoring;
pub mod clock;
pub mod error;
pub mod migrations;
pub mod models;
pub mod progress;
pub mod queries;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, IdGenerator, ManualClock, RandomIds, SystemClock};
pub use error::{Result, StoreError};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Handle to the progress store. Every operation goes through this handle;
/// there is no other path to the underlying connection.
pub struct Database {
    conn: Mutex<Connection>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers in other processes
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {} (journal_mode={})", path.display(), mode);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock: Box::new(SystemClock),
            ids: Box::new(RandomIds),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Fresh identifier from the configured generator, for callers that
    /// create users.
    pub fn next_id(&self) -> uuid::Uuid {
        self.ids.next_id()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one write transaction. Commits on `Ok`; any `Err`
    /// drops the transaction, which rolls back every statement it issued.
    pub(crate) fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                warn!("Rolling back transaction: {}", e);
                Err(e)
            }
        }
    }
}
