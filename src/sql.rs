//! Quoting helpers for the statements sent to PostgreSQL.
//!
//! Role and schema names cannot be bound as parameters in DDL, so every name
//! coming from a roster goes through [quote_ident] and every password through
//! [quote_literal] or [md5_password].

/// Quote an identifier so it is always read as a single name.
///
/// ASCII letters are folded to lower case first, which is what PostgreSQL does
/// with unquoted names, so `Alice`, `alice` and `"alice"` all address the same
/// role.
pub fn quote_ident(name: &str) -> String {
    let folded = name.to_ascii_lowercase();
    format!("\"{}\"", folded.replace('"', "\"\""))
}

/// Quote a string literal.
///
/// Backslashes switch to the `E''` form with doubled backslashes so the result
/// does not depend on `standard_conforming_strings`.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}

/// Pre-encrypted password accepted by `CREATE USER ... PASSWORD`.
///
/// PostgreSQL salts md5 passwords with the role name, so `login` must be the
/// name as stored in the catalog (lower case for folded identifiers).
pub fn md5_password(password: &str, login: &str) -> String {
    let digest = md5::compute(format!("{}{}", password, login));
    format!("md5{:x}", digest)
}
