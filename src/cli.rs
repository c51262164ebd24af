use crate::config::{parse_field_number, parse_separator};
use indoc::indoc;
use std::path::PathBuf;
use structopt::StructOpt;

const AFTER_HELP: &str = indoc! {r#"
    Every roster line gives one account: a login role with its initial
    password and a schema of the same name owned by it. A name starting
    with a digit gets a letter prefix: u for the role, s for the schema.

    Fields can be quoted with " and any character can be escaped with \.
"#};

/// Create or delete PostgreSQL student accounts from a roster file
#[derive(Debug, StructOpt)]
#[structopt(name = "pgaccounts", after_help = AFTER_HELP)]
pub struct Cli {
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Create accounts
    Create {
        #[structopt(flatten)]
        roster: RosterArgs,

        /// Initial password is field <n> (default 1)
        #[structopt(short, long, parse(try_from_str = parse_field_number))]
        password_field: Option<usize>,

        /// Grant <role> to every account (the last one given wins)
        #[structopt(short, long, number_of_values = 1)]
        role: Vec<String>,

        /// Send md5 encrypted passwords instead of plain text
        #[structopt(long)]
        md5: bool,

        #[structopt(flatten)]
        conn: ConnectionArgs,
    },

    /// Delete accounts
    Delete {
        #[structopt(flatten)]
        roster: RosterArgs,

        /// Ignored for deletion
        #[structopt(short, long, number_of_values = 1)]
        role: Vec<String>,

        #[structopt(flatten)]
        conn: ConnectionArgs,
    },
}

#[derive(StructOpt, Debug)]
pub struct RosterArgs {
    /// The roster file
    #[structopt(parse(from_os_str))]
    pub file: PathBuf,

    /// Identifier is field <n> (default 1)
    #[structopt(short, long, parse(try_from_str = parse_field_number))]
    pub id_field: Option<usize>,

    /// Field separator (default ',')
    #[structopt(short, long, parse(try_from_str = parse_separator))]
    pub separator: Option<u8>,

    /// Omit the first <n> lines of the roster (headers)
    #[structopt(short = "x", long)]
    pub skip: Option<usize>,

    /// Print the statements without connecting to the database
    #[structopt(long)]
    pub dryrun: bool,
}

#[derive(StructOpt, Debug)]
pub struct ConnectionArgs {
    /// Database (default postgres, the last one given wins)
    #[structopt(short, long, number_of_values = 1)]
    pub dbname: Vec<String>,

    /// Postgres server, optionally followed by ':port'
    #[structopt(short = "H", long)]
    pub host: Option<String>,

    /// Postgres superuser
    #[structopt(short = "U", long)]
    pub user: Option<String>,

    /// Configuration file
    #[structopt(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,
}

// Parse the command line arguments
pub fn parse() -> Cli {
    Cli::from_args()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::from_iter_safe(&[
            "pgaccounts",
            "create",
            "-i",
            "2",
            "-p",
            "3",
            "-s",
            ";",
            "-x",
            "1",
            "-r",
            "students",
            "-H",
            "localhost:5432",
            "roster.csv",
        ])
        .unwrap();

        match cli.cmd {
            Command::Create {
                roster,
                password_field,
                role,
                md5,
                conn,
            } => {
                assert_eq!(roster.file, PathBuf::from("roster.csv"));
                assert_eq!(roster.id_field, Some(2));
                assert_eq!(roster.separator, Some(b';'));
                assert_eq!(roster.skip, Some(1));
                assert_eq!(password_field, Some(3));
                assert_eq!(role, vec!["students".to_string()]);
                assert!(!md5);
                assert_eq!(conn.host.as_deref(), Some("localhost:5432"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeated_role_and_dbname() {
        let cli = Cli::from_iter_safe(&[
            "pgaccounts", "create", "-r", "students", "-r", "teachers", "-d", "a", "-d", "b",
            "roster.csv",
        ])
        .unwrap();

        match cli.cmd {
            Command::Create { role, conn, .. } => {
                assert_eq!(role, vec!["students".to_string(), "teachers".to_string()]);
                assert_eq!(conn.dbname, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete_has_no_password_field() {
        let result = Cli::from_iter_safe(&["pgaccounts", "delete", "-p", "2", "roster.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_field_number() {
        let result = Cli::from_iter_safe(&["pgaccounts", "create", "-i", "0", "roster.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_missing_operation() {
        let result = Cli::from_iter_safe(&["pgaccounts", "roster.csv"]);
        assert!(result.is_err());
    }
}
