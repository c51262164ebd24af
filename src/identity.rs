use crate::sql::{quote_ident, quote_literal};
use std::fmt;

/// Names derived from a roster identifier.
///
/// PostgreSQL names cannot start with a digit, so an identifier such as
/// `7alice` gets a one-letter prefix that depends on where the name is used:
///
///  - `u` for the login role (`u7alice`),
///  - `s` when the schema is created (`s7alice`),
///  - `S` and `U` in the drop statements.
///
/// Upper and lower case prefixes resolve to the same catalog entry once the
/// name goes through [quote_ident], so an account created from `7alice` is
/// the one deleted from `7alice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    raw: String,
}

impl AccountIdentity {
    pub fn new(identifier: &str) -> Self {
        Self {
            raw: identifier.to_string(),
        }
    }

    fn prefixed(&self, letter: char) -> String {
        match self.raw.chars().next() {
            Some(c) if c.is_ascii_digit() => format!("{}{}", letter, self.raw),
            _ => self.raw.clone(),
        }
    }

    /// Login role name, also used in the per-account output lines.
    pub fn login_name(&self) -> String {
        self.prefixed('u')
    }

    pub fn namespace_name(&self) -> String {
        self.prefixed('s')
    }

    pub fn drop_namespace_name(&self) -> String {
        self.prefixed('S')
    }

    pub fn drop_login_name(&self) -> String {
        self.prefixed('U')
    }

    /// Role name as stored in the catalog.
    pub fn catalog_login_name(&self) -> String {
        self.login_name().to_ascii_lowercase()
    }

    pub fn to_sql_create_user(&self, password_literal: &str) -> String {
        format!(
            "CREATE USER {} WITH PASSWORD {}",
            quote_ident(&self.login_name()),
            password_literal
        )
    }

    pub fn to_sql_create_schema(&self) -> String {
        format!(
            "CREATE SCHEMA {} AUTHORIZATION {}",
            quote_ident(&self.namespace_name()),
            quote_ident(&self.login_name())
        )
    }

    /// Make unqualified names resolve into the account's own schema first.
    pub fn to_sql_set_search_path(&self) -> String {
        format!(
            "ALTER ROLE {} SET search_path TO {}, public",
            quote_ident(&self.login_name()),
            quote_ident(&self.namespace_name())
        )
    }

    pub fn to_sql_grant_role(&self, role: &str) -> String {
        format!(
            "GRANT {} TO {}",
            quote_ident(role),
            quote_ident(&self.login_name())
        )
    }

    pub fn to_sql_drop_schema(&self) -> String {
        format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            quote_ident(&self.drop_namespace_name())
        )
    }

    pub fn to_sql_drop_owned(&self) -> String {
        format!(
            "DROP OWNED BY {} RESTRICT",
            quote_ident(&self.drop_login_name())
        )
    }

    pub fn to_sql_drop_user(&self) -> String {
        format!(
            "DROP USER IF EXISTS {}",
            quote_ident(&self.drop_login_name())
        )
    }

    /// Plain-text password literal for [AccountIdentity::to_sql_create_user].
    pub fn password_literal(&self, secret: &str) -> String {
        quote_literal(secret)
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.login_name())
    }
}
