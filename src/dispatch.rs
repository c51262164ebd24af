use crate::config::{Mode, Settings};
use crate::identity::AccountIdentity;
use crate::lifecycle::{deprovision, provision};
use crate::roster::{FieldTokenizer, RosterError};
use crate::session::Session;
use crate::transaction::TransactionOutcome;
use ansi_term::Colour::{Green, Red};
use anyhow::Result;
use ascii_table::AsciiTable;
use log::{debug, info, warn};
use std::fmt;
use std::io::{Read, Write};

/// Result of one roster line that reached the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub line: usize,
    pub account: String,
    pub outcome: TransactionOutcome,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub mode: Mode,
    /// Accounts created or deleted
    pub count: usize,
    pub reports: Vec<AccountReport>,
    /// The roster ended in the middle of an escape sequence
    pub truncated: bool,
}

impl Summary {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            count: 0,
            reports: vec![],
            truncated: false,
        }
    }

    /// Print summary table
    pub fn print_table(&self) {
        if self.reports.is_empty() {
            return;
        }

        let mut rows = vec![
            vec![
                "Line".to_string(),
                "Account".to_string(),
                "Action".to_string(),
                "Statements".to_string(),
                "Detail".to_string(),
            ],
            vec![
                "---".to_string(),
                "---".to_string(),
                "---".to_string(),
                "---".to_string(),
                "---".to_string(),
            ],
        ];

        for report in &self.reports {
            let action = if report.outcome.committed {
                Green.paint(self.mode.past_tense()).to_string()
            } else {
                Red.paint("rolled back").to_string()
            };

            rows.push(vec![
                report.line.to_string(),
                report.account.clone(),
                action,
                report.outcome.statements_attempted.to_string(),
                report.outcome.first_failure.clone().unwrap_or_default(),
            ]);
        }

        // Get the terminal with
        let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(120);

        let mut table = AsciiTable::default();
        table.set_max_width(term_width.saturating_sub(5).max(40));

        info!("Summary:\n{}", table.format(rows));
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "*** {} account{} {} ***",
            self.count,
            if self.count == 1 { "" } else { "s" },
            self.mode.past_tense()
        )
    }
}

/// Read the roster and create or delete one account per data line.
///
/// The first `settings.skip` lines are headers and never reach the database.
/// Every account goes through its own transaction, and a line that fails is
/// left out of the count without stopping the run. `out` receives one line
/// per account created or deleted.
pub fn run<R, S, W>(settings: &Settings, roster: R, session: &mut S, out: &mut W) -> Result<Summary>
where
    R: Read,
    S: Session + ?Sized,
    W: Write,
{
    let mut summary = Summary::new(settings.mode);

    for line in FieldTokenizer::new(roster, settings.layout) {
        let line = match line {
            Ok(line) => line,
            Err(e @ RosterError::TruncatedEscape { .. }) => {
                warn!("{} in {:?}, stopping", e, settings.roster);
                summary.truncated = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if line.number <= settings.skip {
            debug!("skipping header line {}", line.number);
            continue;
        }

        if line.identifier.is_empty() {
            warn!("line {}: empty identifier, skipped", line.number);
            continue;
        }

        let identity = AccountIdentity::new(&line.identifier);
        let outcome = match settings.mode {
            Mode::Create => provision(session, &identity, &line.secret, &settings.provision),
            Mode::Delete => deprovision(session, &identity),
        };

        if outcome.committed {
            writeln!(
                out,
                "-- account {} {}",
                identity.login_name(),
                settings.mode.past_tense()
            )?;
            summary.count += 1;
        }

        summary.reports.push(AccountReport {
            line: line.number,
            account: identity.login_name(),
            outcome,
        });
    }

    Ok(summary)
}
