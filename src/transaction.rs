use crate::session::Session;
use ansi_term::Colour::Red;
use log::{debug, error};

/// Where a [Transaction] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    NotStarted,
    InTransaction,
    Savepointed,
    Committed,
    RolledBack,
}

/// What happened to one account's transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionOutcome {
    pub committed: bool,
    pub statements_attempted: usize,
    pub first_failure: Option<String>,
}

/// One account's transaction on a [Session].
///
/// Bookkeeping statements (`START TRANSACTION`, `COMMIT`, savepoints...) are
/// best effort: a failure is logged and nothing else happens. The caller
/// decides on success through the result of [Transaction::execute].
///
/// A transaction dropped before [Transaction::commit] or
/// [Transaction::rollback] is rolled back.
pub struct Transaction<'s, S: Session + ?Sized> {
    session: &'s mut S,
    state: TxState,
    attempted: usize,
    first_failure: Option<String>,
}

impl<'s, S: Session + ?Sized> Transaction<'s, S> {
    pub fn begin(session: &'s mut S) -> Self {
        let mut tx = Self {
            session,
            state: TxState::NotStarted,
            attempted: 0,
            first_failure: None,
        };
        tx.bookkeeping("start tx", "START TRANSACTION");
        tx.state = TxState::InTransaction;
        tx
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> TxState {
        self.state
    }

    pub fn warning_count(&self) -> usize {
        self.session.warning_count()
    }

    /// Run a statement that must succeed. `label` names the operation in the
    /// error log.
    pub fn execute(&mut self, label: &str, sql: &str) -> bool {
        self.attempted += 1;
        debug!("{}: {}", label, sql);

        match self.session.execute(sql) {
            Ok(()) => true,
            Err(e) => {
                self.fail(label, &e.to_string());
                false
            }
        }
    }

    /// Run a statement whose failure is acceptable.
    pub fn tolerate(&mut self, sql: &str) -> bool {
        self.attempted += 1;

        match self.session.execute(sql) {
            Ok(()) => true,
            Err(e) => {
                debug!("ignored failure of `{}`: {}", sql, e);
                false
            }
        }
    }

    /// Record a failure that did not come from a statement error.
    pub fn fail(&mut self, label: &str, message: &str) {
        error!("{} {}: {}", Red.paint("Failed"), label, message);
        if self.first_failure.is_none() {
            self.first_failure = Some(format!("{}: {}", label, message));
        }
    }

    pub fn savepoint(&mut self, name: &str) {
        self.bookkeeping("savepoint", &format!("SAVEPOINT {}", name));
        self.state = TxState::Savepointed;
    }

    /// Leave a savepoint, undoing what happened since it was set when
    /// `rollback_first` is true.
    pub fn release(&mut self, name: &str, rollback_first: bool) {
        if rollback_first {
            self.bookkeeping(
                "rollback savepoint",
                &format!("ROLLBACK TO SAVEPOINT {}", name),
            );
        }
        self.bookkeeping("release savepoint", &format!("RELEASE SAVEPOINT {}", name));
        self.state = TxState::InTransaction;
    }

    /// The outcome is committed only if the server accepted the COMMIT.
    pub fn commit(mut self) -> TransactionOutcome {
        let committed = self.bookkeeping("commit tx", "COMMIT");
        self.state = TxState::Committed;
        if !committed && self.first_failure.is_none() {
            self.first_failure = Some("commit tx failed".to_string());
        }
        self.outcome(committed)
    }

    pub fn rollback(mut self) -> TransactionOutcome {
        self.bookkeeping("rollback tx", "ROLLBACK");
        self.state = TxState::RolledBack;
        self.outcome(false)
    }

    fn outcome(&mut self, committed: bool) -> TransactionOutcome {
        TransactionOutcome {
            committed,
            statements_attempted: self.attempted,
            first_failure: self.first_failure.take(),
        }
    }

    fn bookkeeping(&mut self, label: &str, sql: &str) -> bool {
        match self.session.execute(sql) {
            Ok(()) => true,
            Err(e) => {
                error!("{} {}: {}", Red.paint("Failed"), label, e);
                false
            }
        }
    }
}

impl<'s, S: Session + ?Sized> Drop for Transaction<'s, S> {
    fn drop(&mut self) {
        if matches!(self.state, TxState::InTransaction | TxState::Savepointed) {
            self.bookkeeping("rollback tx", "ROLLBACK");
            self.state = TxState::RolledBack;
        }
    }
}
