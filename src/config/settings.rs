use super::config_base::Config;
use super::connection::Connection;
use crate::cli::{Command, ConnectionArgs, RosterArgs};
use crate::lifecycle::ProvisionOptions;
use crate::roster::{RosterLayout, DEFAULT_FIELD, DEFAULT_SEPARATOR};
use anyhow::{anyhow, Result};
use log::warn;
use std::fmt;
use std::path::{Path, PathBuf};

/// The operation applied to every account of the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Create,
    Delete,
}

impl Mode {
    /// Verb used in the output lines.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Mode::Create => "created",
            Mode::Delete => "deleted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Create => write!(f, "create"),
            Mode::Delete => write!(f, "delete"),
        }
    }
}

/// Everything a run needs, resolved from the command line, the optional
/// configuration file and the defaults, in that order of precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub mode: Mode,
    pub roster: PathBuf,
    pub layout: RosterLayout,
    /// Number of header lines
    pub skip: usize,
    pub provision: ProvisionOptions,
    pub dryrun: bool,
    pub connection: Connection,
}

impl Settings {
    pub fn from_command(cmd: Command) -> Result<Self> {
        match cmd {
            Command::Create {
                roster,
                password_field,
                role,
                md5,
                conn,
            } => {
                let config = load_config(&conn)?;
                let mut settings = Self::resolve(Mode::Create, roster, conn, &config)?;

                settings.layout.secret_field = password_field
                    .or(config.roster.password_field)
                    .unwrap_or(DEFAULT_FIELD);
                settings.provision = ProvisionOptions {
                    role: last_value(role, "role").or(config.roster.role),
                    encrypt_password: md5,
                };

                Ok(settings)
            }

            Command::Delete { roster, role, conn } => {
                if let Some(role) = last_value(role, "role") {
                    warn!("role {} ignored for deletion", role);
                }

                let config = load_config(&conn)?;
                Self::resolve(Mode::Delete, roster, conn, &config)
            }
        }
    }

    fn resolve(
        mode: Mode,
        roster: RosterArgs,
        conn: ConnectionArgs,
        config: &Config,
    ) -> Result<Self> {
        validate_roster(&roster.file)?;

        let layout = RosterLayout {
            separator: match roster.separator {
                Some(separator) => separator,
                None => config.roster.separator()?.unwrap_or(DEFAULT_SEPARATOR),
            },
            id_field: roster
                .id_field
                .or(config.roster.id_field)
                .unwrap_or(DEFAULT_FIELD),
            secret_field: DEFAULT_FIELD,
        };

        let overrides = Connection {
            dbname: last_value(conn.dbname, "database"),
            host: conn.host,
            user: conn.user,
            ..Default::default()
        };
        let connection = config.connection.merge(&overrides);
        connection.validate()?;

        Ok(Self {
            mode,
            roster: roster.file,
            layout,
            skip: roster.skip.or(config.roster.skip).unwrap_or(0),
            provision: ProvisionOptions::default(),
            dryrun: roster.dryrun,
            connection,
        })
    }
}

fn load_config(conn: &ConnectionArgs) -> Result<Config> {
    match &conn.config {
        Some(path) => Config::new(path),
        None => Ok(Config::default()),
    }
}

/// An option given more than once keeps its last value.
fn last_value(values: Vec<String>, what: &str) -> Option<String> {
    let mut last: Option<String> = None;
    for value in values {
        if let Some(previous) = &last {
            warn!("{} {} replaced by {}", what, previous, value);
        }
        last = Some(value);
    }

    last
}

/// The roster must be an existing regular file.
fn validate_roster(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("{:?} - file does not exist", path));
    }
    if path.is_dir() {
        return Err(anyhow!("{:?} is a directory", path));
    }

    Ok(())
}
