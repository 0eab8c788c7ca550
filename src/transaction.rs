//! Scoped transaction guard.

use crate::connection::Connection;

/// Transaction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Unknown,
    Began,
    Committed,
    Reverted,
}

/// A scoped state-machine wrapper around one connection's transaction
/// primitives.
///
/// `begin` is valid only from `Unknown`; `commit`/`rollback` only from
/// `Began`, each terminal. Dropping the guard while still in `Began`
/// attempts exactly one best-effort rollback; its result is swallowed, so
/// no transaction is left open on scope exit but success of the rollback is
/// not guaranteed.
pub struct Transaction<'c> {
    conn: &'c Connection,
    state: TxState,
}

impl<'c> Transaction<'c> {
    #[must_use]
    pub fn new(conn: &'c Connection) -> Self {
        Transaction {
            conn,
            state: TxState::Unknown,
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn begin(&mut self) -> bool {
        if self.state != TxState::Unknown {
            return false;
        }
        if !self.conn.begin_transaction() {
            return false;
        }
        self.state = TxState::Began;
        true
    }

    /// Move to `Committed` and report the connection-level result.
    pub fn commit(&mut self) -> bool {
        if self.state != TxState::Began {
            return false;
        }
        self.state = TxState::Committed;
        self.conn.commit_transaction()
    }

    /// Move to `Reverted` and report the connection-level result.
    pub fn rollback(&mut self) -> bool {
        if self.state != TxState::Began {
            return false;
        }
        self.state = TxState::Reverted;
        self.conn.rollback_transaction()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TxState::Began {
            let _ = self.conn.rollback_transaction();
        }
    }
}
