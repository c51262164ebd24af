use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{fmt, fs};

pub use super::connection::{Connection, ConnectionType};

/// Configuration file, every section is optional.
///  - `connection`: how to reach the database, see [Connection].
///  - `roster`: defaults for the roster layout and the role to grant, see
///  [RosterSection].
///
/// Command line options take precedence over the values found here.
///
/// For example:
///
/// ```yaml
/// connection:
///   type: postgres
///   dbname: classroom
///   host: localhost:5432
///   user: instructor
///   password: ${PGACCOUNTS_PASSWORD}
///
/// roster:
///   separator: ";"
///   id_field: 2
///   password_field: 3
///   skip: 1
///   role: students
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub roster: RosterSection,
}

/// Defaults for reading the roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RosterSection {
    pub separator: Option<String>,
    pub id_field: Option<usize>,
    pub password_field: Option<usize>,
    pub skip: Option<usize>,
    pub role: Option<String>,
}

impl RosterSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(separator) = &self.separator {
            parse_separator(separator).map_err(|e| anyhow!("roster.separator: {}", e))?;
        }
        if self.id_field == Some(0) {
            return Err(anyhow!("roster.id_field: fields are numbered from 1"));
        }
        if self.password_field == Some(0) {
            return Err(anyhow!("roster.password_field: fields are numbered from 1"));
        }
        if matches!(&self.role, Some(role) if role.is_empty()) {
            return Err(anyhow!("roster.role is empty"));
        }

        Ok(())
    }

    pub fn separator(&self) -> Result<Option<u8>> {
        self.separator
            .as_deref()
            .map(|s| parse_separator(s).map_err(|e| anyhow!(e)))
            .transpose()
    }
}

/// A separator is a single ASCII character.
pub fn parse_separator(value: &str) -> Result<u8, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if matches!(c, '"' | '\\' | '\n') => Err(format!(
            "`{}` cannot be used as separator",
            c.escape_default()
        )),
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(format!(
            "invalid separator `{}`, expected a single ASCII character",
            value
        )),
    }
}

/// Field numbers start at 1.
pub fn parse_field_number(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("invalid field number 0, fields are numbered from 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid field number `{}`", value)),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut redacted = self.clone();
        if redacted.connection.password.is_some() {
            redacted.connection.password = Some("********".to_string());
        }

        match serde_yaml::to_string(&redacted) {
            Ok(yaml) => write!(f, "{}", yaml),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(s)?;

        // Validate
        config.validate()?;

        Ok(config)
    }
}

impl Config {
    pub fn new(config_path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(config_path).with_context(|| {
            format!("failed to read config file `{}`", config_path.display())
        })?;
        let config: Config = serde_yaml::from_str(&config_str)?;

        // expand env variables
        let config = config.expand_env_vars()?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.roster.validate()?;

        Ok(())
    }

    // Expand env variables in config
    fn expand_env_vars(&self) -> Result<Self> {
        let mut config = self.clone();

        // expand connection
        config.connection = config.connection.expand_env_vars()?;

        Ok(config)
    }
}
