use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by store operations.
///
/// Absence is never an error: lookups return `Option` or an empty collection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE, PRIMARY KEY, FOREIGN KEY, NOT NULL or CHECK constraint rejected
    /// the write. The enclosing transaction has been rolled back.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("storage fault: {0}")]
    StorageFault(#[source] rusqlite::Error),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A stored identifier or timestamp could not be decoded.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(msg.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => Self::StorageFault(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_failure_is_a_constraint_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: StoreError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn syntax_error_is_a_storage_fault() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: StoreError = conn.execute("NOT SQL", []).unwrap_err().into();
        assert!(matches!(err, StoreError::StorageFault(_)));
    }
}
