use ansi_term::Colour::Purple;
use anyhow::Result;
use log::info;
use std::fmt;

/// A non-error message reported by the server while running a statement,
/// e.g. `role "bob" does not exist, skipping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: String,
    pub code: String,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}): {}", self.severity, self.code, self.message)
    }
}

/// The database side of an account run.
///
/// Implementations execute one statement at a time and keep a running count
/// of the notices received, which callers compare before and after a
/// statement to detect warnings.
pub trait Session {
    /// Execute a statement. The error carries the server message.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Number of notices received since the session was opened.
    fn warning_count(&self) -> usize;
}

/// Session used by `--dryrun`: statements are logged, never sent.
#[derive(Debug, Default)]
pub struct DryRunSession;

impl Session for DryRunSession {
    fn execute(&mut self, sql: &str) -> Result<()> {
        info!("{}: {}", Purple.paint("Dry-run"), sql);
        Ok(())
    }

    fn warning_count(&self) -> usize {
        0
    }
}
