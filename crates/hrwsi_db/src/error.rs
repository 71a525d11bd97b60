//! Store-level error classification (spec.md §7).
//!
//! `sqlx` errors are triaged once, at the gateway boundary, into the three
//! categories every caller needs to act on: retry, treat-as-done, or
//! propagate as a bug.

use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure: connection reset, pool exhaustion, timeout.
    /// The caller should retry the current cycle.
    #[error("transient database error: {0}")]
    Transient(#[source] sqlx::Error),

    /// A unique-constraint violation. Spec.md invariant 1/2/3: this means
    /// the row (or its validation/task) already exists and the caller
    /// should treat the operation as a no-op, not an error.
    #[error("conflict: row already exists")]
    Conflict,

    /// Any other database error (malformed SQL, missing table, etc.) that
    /// is a programming bug rather than a runtime condition to recover
    /// from.
    #[error("database error: {0}")]
    Other(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::Conflict;
            }
        }
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Transient(err)
            }
            _ => StoreError::Other(err),
        }
    }
}

impl StoreError {
    /// True when the failed operation is safe to treat as "already done"
    /// (spec.md §7, `Conflict`).
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }

    /// True when the caller should retry on its next cycle rather than
    /// escalate.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_recognised_as_non_fatal() {
        let err = StoreError::Conflict;
        assert!(err.is_conflict());
        assert!(!err.is_transient());
    }
}
