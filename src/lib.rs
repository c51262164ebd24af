pub mod cli;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod identity;
pub mod lifecycle;
pub mod roster;
pub mod session;
pub mod sql;
pub mod transaction;

use anyhow::{Context, Result};
use config::Settings;
use connection::DbConnection;
use dispatch::Summary;
use session::{DryRunSession, Session};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Open the roster file
pub fn open_roster(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("could not read file `{}`", path.display()))
}

/// Open the session the settings ask for: a dry run or a real connection.
pub fn open_session(settings: &Settings) -> Result<Box<dyn Session>> {
    if settings.dryrun {
        return Ok(Box::new(DryRunSession));
    }

    let connection = settings.connection.clone().with_password()?;
    Ok(Box::new(DbConnection::new(&connection)?))
}

/// Process the whole roster and print the per-account lines and the summary
/// line on stdout.
pub fn execute(settings: &Settings) -> Result<Summary> {
    let roster = open_roster(&settings.roster)?;
    let mut session = open_session(settings)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = dispatch::run(settings, roster, session.as_mut(), &mut out)?;
    writeln!(out, "{}", summary)?;
    out.flush()?;

    Ok(summary)
}
