use anyhow::{anyhow, Context, Result};
use envmnt::{ExpandOptions, ExpansionType};
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE: &str = "postgres";
pub const DEFAULT_HOST: &str = "localhost";

/// Connection type. Supported values: Postgres
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub enum ConnectionType {
    #[serde(rename = "postgres")]
    #[default]
    Postgres,
}

/// Connection configuration section.
/// The user on the connection should be allowed to create roles and schemas.
///
/// For example:
/// ```yaml
/// connection:
///   type: postgres
///   dbname: classroom
///   host: localhost:5432
///   user: postgres
///   password: ${PGACCOUNTS_PASSWORD}
/// ```
///
/// Every field is optional. Missing values fall back to the libpq defaults,
/// except the database which defaults to `postgres`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    #[serde(rename = "type", default)]
    pub type_: ConnectionType,
    pub dbname: Option<String>,
    /// `host` or `host:port`
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Connection {
    pub fn validate(&self) -> Result<()> {
        match self.type_ {
            ConnectionType::Postgres => (),
        }

        self.host_and_port()?;

        Ok(())
    }

    /// Expand environment variables in the connection values.
    /// For example: `password: ${PGACCOUNTS_PASSWORD}`
    pub fn expand_env_vars(&self) -> Result<Self> {
        let expand = |value: &Option<String>| -> Option<String> {
            value.as_ref().map(|v| {
                let options = ExpandOptions {
                    expansion_type: Some(ExpansionType::UnixBracketsWithDefaults),
                    default_to_empty: false,
                };
                envmnt::expand(v, Some(options))
            })
        };

        let connection = Self {
            type_: self.type_.clone(),
            dbname: expand(&self.dbname),
            host: expand(&self.host),
            user: expand(&self.user),
            password: expand(&self.password),
        };

        // Most likely, the user forgot to export the environment variables.
        for value in [&connection.dbname, &connection.host, &connection.user]
            .into_iter()
            .flatten()
        {
            if value.contains("${") {
                warn!(
                    "The connection may not have fully expanded environment variables: {}",
                    value
                );
            }
        }
        if matches!(&connection.password, Some(p) if p.contains("${")) {
            warn!("The connection password may not have fully expanded environment variables");
        }

        Ok(connection)
    }

    /// Values set in `other` replace the ones in `self`.
    pub fn merge(&self, other: &Connection) -> Self {
        Self {
            type_: self.type_.clone(),
            dbname: other.dbname.clone().or_else(|| self.dbname.clone()),
            host: other.host.clone().or_else(|| self.host.clone()),
            user: other.user.clone().or_else(|| self.user.clone()),
            password: other.password.clone().or_else(|| self.password.clone()),
        }
    }

    pub fn dbname(&self) -> &str {
        self.dbname.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    /// Split `host:port` at the last colon.
    pub fn host_and_port(&self) -> Result<(Option<&str>, Option<u16>)> {
        let host = match &self.host {
            Some(host) => host,
            None => return Ok((None, None)),
        };

        match host.rsplit_once(':') {
            Some((name, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| anyhow!("invalid port `{}` in host `{}`", port, host))?;
                Ok((Some(name), Some(port)))
            }
            None => Ok((Some(host.as_str()), None)),
        }
    }

    /// libpq style `key=value` connection string.
    pub fn to_conninfo(&self) -> Result<String> {
        self.conninfo(false)
    }

    /// Connection string safe to log: the password is masked.
    pub fn to_redacted_conninfo(&self) -> Result<String> {
        self.conninfo(true)
    }

    fn conninfo(&self, redact: bool) -> Result<String> {
        let mut parts = vec![format!("dbname={}", conninfo_value(self.dbname()))];

        // Without a host the postgres client refuses to connect, fall back
        // to PGHOST/PGPORT then localhost
        let (host, port) = self.host_and_port()?;
        let port = match port {
            Some(port) => Some(port),
            None => env_port()?,
        };
        let host = match host {
            Some(host) => host.to_string(),
            None => envmnt::get_or("PGHOST", DEFAULT_HOST),
        };

        if let Some(port) = port {
            parts.push(format!("port={}", port));
        }
        parts.push(format!("host={}", conninfo_value(&host)));
        if let Some(user) = &self.user {
            parts.push(format!("user={}", conninfo_value(user)));
        }
        if let Some(password) = &self.password {
            if redact {
                parts.push("password=********".to_string());
            } else {
                parts.push(format!("password={}", conninfo_value(password)));
            }
        }

        Ok(parts.join(" "))
    }

    /// Fill in the password of a connection with a user: `PGPASSWORD` if set,
    /// otherwise ask on the terminal.
    pub fn with_password(self) -> Result<Self> {
        if self.user.is_none() || self.password.is_some() {
            return Ok(self);
        }

        if envmnt::exists("PGPASSWORD") {
            let password = envmnt::get_or("PGPASSWORD", "");
            return Ok(Self {
                password: Some(password),
                ..self
            });
        }

        let password =
            rpassword::prompt_password("Password: ").context("could not read password")?;

        Ok(Self {
            password: Some(password),
            ..self
        })
    }
}

fn env_port() -> Result<Option<u16>> {
    if !envmnt::exists("PGPORT") {
        return Ok(None);
    }

    let port = envmnt::get_or("PGPORT", "");
    port.parse::<u16>()
        .map(Some)
        .map_err(|_| anyhow!("invalid port `{}` in PGPORT", port))
}

/// Quote a conninfo value when it is empty or contains spaces, quotes or
/// backslashes.
fn conninfo_value(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');

    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
