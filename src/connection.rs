use crate::config::Connection;
use crate::session::{Notice, Session};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use postgres::error::DbError;
use postgres::{Client, NoTls};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The single connection of a run.
///
/// Notices sent by the server are not printed: the notice callback logs them
/// at debug level and bumps the counter read by [Session::warning_count].
pub struct DbConnection {
    connection_info: String,
    client: Client,
    notices: Arc<AtomicUsize>,
}

impl DbConnection {
    /// Assemble the connection string and connect to the database.
    pub fn new(connection: &Connection) -> Result<Self> {
        let connection_info = connection.to_redacted_conninfo()?;

        let mut config: postgres::Config = connection
            .to_conninfo()?
            .parse()
            .with_context(|| format!("invalid connection string: {}", connection_info))?;

        let notices = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notices);
        config.notice_callback(move |notice: DbError| {
            let notice = Notice {
                severity: notice.severity().to_string(),
                code: notice.code().code().to_string(),
                message: notice.message().to_string(),
            };
            debug!("notice: {}", notice);
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let client = config
            .connect(NoTls)
            .with_context(|| format!("Connection to database failed: {}", connection_info))?;

        info!("Connected to database: {}", connection_info);

        Ok(Self {
            connection_info,
            client,
            notices,
        })
    }

    /// Returns the connection_info, without the password
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Ping the database
    pub fn ping(&mut self) -> Result<bool> {
        let rows = self.client.execute("SELECT 1", &[])?;

        Ok(rows == 1)
    }

    /// Whether a login role exists
    pub fn role_exists(&mut self, name: &str) -> Result<bool> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1)",
            &[&name],
        )?;

        Ok(row.get(0))
    }

    /// Whether a schema exists
    pub fn schema_exists(&mut self, name: &str) -> Result<bool> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)",
            &[&name],
        )?;

        Ok(row.get(0))
    }
}

impl Session for DbConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        // DDL takes no parameters, the simple query protocol is enough
        self.client.batch_execute(sql).map_err(|e| match e.as_db_error() {
            Some(db) => anyhow!("{}", db.message()),
            None => anyhow!("{}", e),
        })
    }

    fn warning_count(&self) -> usize {
        self.notices.load(Ordering::Relaxed)
    }
}
