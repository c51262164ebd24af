use crate::identity::AccountIdentity;
use crate::session::Session;
use crate::sql::md5_password;
use crate::transaction::{Transaction, TransactionOutcome};
use log::warn;

const DROP_OWNED_SAVEPOINT: &str = "drop_owned";

/// Options applied to every account created in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Role granted to every new account
    pub role: Option<String>,
    /// Send `md5...` pre-encrypted passwords instead of plain text
    pub encrypt_password: bool,
}

/// Create the login role and schema of one account in a single transaction.
///
/// The steps run in order and the first failure rolls everything back:
///
///  1. create the login role with its initial password,
///  2. create the schema, owned by the role,
///  3. put the schema ahead of `public` in the role's search path,
///  4. grant the optional role.
pub fn provision<S: Session + ?Sized>(
    session: &mut S,
    identity: &AccountIdentity,
    secret: &str,
    options: &ProvisionOptions,
) -> TransactionOutcome {
    let password = if options.encrypt_password {
        identity.password_literal(&md5_password(secret, &identity.catalog_login_name()))
    } else {
        identity.password_literal(secret)
    };

    let mut tx = Transaction::begin(session);

    let mut ok = tx.execute("create user", &identity.to_sql_create_user(&password))
        && tx.execute("create schema", &identity.to_sql_create_schema())
        && tx.execute("set search_path", &identity.to_sql_set_search_path());

    if ok {
        if let Some(role) = &options.role {
            ok = tx.execute("grant role", &identity.to_sql_grant_role(role));
        }
    }

    if ok {
        tx.commit()
    } else {
        tx.rollback()
    }
}

/// Drop the schema and login role of one account in a single transaction.
///
/// Dropping the schema cascades to everything in it. Objects the role owns
/// elsewhere are then dropped under a savepoint; if some cannot be dropped the
/// savepoint is rolled back and the role drop below fails on its own.
///
/// `DROP USER IF EXISTS` on a missing role only raises a notice. Any notice
/// during that statement counts as a failure, so accounts that were not there
/// are not reported as deleted.
pub fn deprovision<S: Session + ?Sized>(
    session: &mut S,
    identity: &AccountIdentity,
) -> TransactionOutcome {
    let mut tx = Transaction::begin(session);

    let mut ok = tx.execute("drop schema", &identity.to_sql_drop_schema());

    tx.savepoint(DROP_OWNED_SAVEPOINT);
    let dropped = tx.tolerate(&identity.to_sql_drop_owned());
    tx.release(DROP_OWNED_SAVEPOINT, !dropped);

    if ok {
        let warnings = tx.warning_count();
        ok = tx.execute("drop user", &identity.to_sql_drop_user());

        let raised = tx.warning_count() - warnings;
        if ok && raised > 0 {
            warn!(
                "drop user {} raised {} warning(s), account not deleted",
                identity, raised
            );
            tx.fail(
                "drop user",
                &format!("{} warning(s) raised, role missing or not dropped", raised),
            );
            ok = false;
        }
    }

    if ok {
        tx.commit()
    } else {
        tx.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ScriptedSession;

    fn identity(raw: &str) -> AccountIdentity {
        AccountIdentity::new(raw)
    }

    #[test]
    fn test_provision() {
        let mut session = ScriptedSession::new();
        let outcome = provision(
            &mut session,
            &identity("alice"),
            "secretpw",
            &ProvisionOptions::default(),
        );

        assert!(outcome.committed);
        assert_eq!(outcome.statements_attempted, 3);
        assert_eq!(
            session.executed,
            vec![
                "START TRANSACTION",
                "CREATE USER \"alice\" WITH PASSWORD 'secretpw'",
                "CREATE SCHEMA \"alice\" AUTHORIZATION \"alice\"",
                "ALTER ROLE \"alice\" SET search_path TO \"alice\", public",
                "COMMIT",
            ]
        );
    }

    #[test]
    fn test_provision_with_role() {
        let mut session = ScriptedSession::new();
        let options = ProvisionOptions {
            role: Some("students".to_string()),
            encrypt_password: false,
        };
        let outcome = provision(&mut session, &identity("7alice"), "pw", &options);

        assert!(outcome.committed);
        assert_eq!(outcome.statements_attempted, 4);
        assert_eq!(
            session.work(),
            vec![
                "CREATE USER \"u7alice\" WITH PASSWORD 'pw'",
                "CREATE SCHEMA \"s7alice\" AUTHORIZATION \"u7alice\"",
                "ALTER ROLE \"u7alice\" SET search_path TO \"s7alice\", public",
                "GRANT \"students\" TO \"u7alice\"",
            ]
        );
    }

    #[test]
    fn test_provision_md5_password() {
        let mut session = ScriptedSession::new();
        let options = ProvisionOptions {
            role: None,
            encrypt_password: true,
        };
        provision(&mut session, &identity("Bob"), "hunter2", &options);

        let expected = format!(
            "CREATE USER \"bob\" WITH PASSWORD 'md5{:x}'",
            md5::compute("hunter2bob")
        );
        assert_eq!(session.work()[0], expected);
        assert!(!session.executed.iter().any(|s| s.contains("hunter2")));
    }

    #[test]
    fn test_provision_failure_short_circuits() {
        let mut session =
            ScriptedSession::new().fail_on("CREATE SCHEMA", "schema \"alice\" already exists");
        let options = ProvisionOptions {
            role: Some("students".to_string()),
            encrypt_password: false,
        };
        let outcome = provision(&mut session, &identity("alice"), "pw", &options);

        assert!(!outcome.committed);
        assert_eq!(outcome.statements_attempted, 2);
        assert_eq!(
            outcome.first_failure.as_deref(),
            Some("create schema: schema \"alice\" already exists")
        );
        assert_eq!(session.work().len(), 2);
        assert_eq!(session.executed.last().unwrap(), "ROLLBACK");
    }

    #[test]
    fn test_provision_grant_failure_rolls_back() {
        let mut session = ScriptedSession::new().fail_on("GRANT", "role \"nope\" does not exist");
        let options = ProvisionOptions {
            role: Some("nope".to_string()),
            encrypt_password: false,
        };
        let outcome = provision(&mut session, &identity("alice"), "pw", &options);

        assert!(!outcome.committed);
        assert_eq!(session.executed.last().unwrap(), "ROLLBACK");
    }

    #[test]
    fn test_deprovision() {
        let mut session = ScriptedSession::new();
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(outcome.committed);
        assert_eq!(outcome.statements_attempted, 3);
        assert_eq!(
            session.executed,
            vec![
                "START TRANSACTION",
                "DROP SCHEMA IF EXISTS \"alice\" CASCADE",
                "SAVEPOINT drop_owned",
                "DROP OWNED BY \"alice\" RESTRICT",
                "RELEASE SAVEPOINT drop_owned",
                "DROP USER IF EXISTS \"alice\"",
                "COMMIT",
            ]
        );
    }

    #[test]
    fn test_deprovision_digit_identifier() {
        let mut session = ScriptedSession::new();
        deprovision(&mut session, &identity("7alice"));

        assert_eq!(
            session.work(),
            vec![
                "DROP SCHEMA IF EXISTS \"s7alice\" CASCADE",
                "DROP OWNED BY \"u7alice\" RESTRICT",
                "DROP USER IF EXISTS \"u7alice\"",
            ]
        );
    }

    #[test]
    fn test_deprovision_drop_owned_failure_is_tolerated() {
        let mut session = ScriptedSession::new().fail_on("DROP OWNED", "cannot drop objects");
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(outcome.committed);
        assert_eq!(outcome.first_failure, None);
        assert!(session
            .executed
            .contains(&"ROLLBACK TO SAVEPOINT drop_owned".to_string()));
        assert_eq!(session.executed.last().unwrap(), "COMMIT");
    }

    #[test]
    fn test_deprovision_drop_owned_notice_is_not_an_error() {
        let mut session = ScriptedSession::new().warn_on("DROP OWNED");
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(outcome.committed);
    }

    #[test]
    fn test_deprovision_missing_role_warning_fails() {
        let mut session = ScriptedSession::new().warn_on("DROP USER");
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(!outcome.committed);
        assert!(outcome.first_failure.unwrap().starts_with("drop user"));
        assert_eq!(session.executed.last().unwrap(), "ROLLBACK");
    }

    #[test]
    fn test_deprovision_drop_schema_failure_skips_drop_user() {
        let mut session = ScriptedSession::new().fail_on("DROP SCHEMA", "permission denied");
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(!outcome.committed);
        assert!(!session.executed.iter().any(|s| s.starts_with("DROP USER")));
        assert_eq!(session.executed.last().unwrap(), "ROLLBACK");
    }

    #[test]
    fn test_deprovision_drop_user_failure() {
        let mut session =
            ScriptedSession::new().fail_on("DROP USER", "role \"alice\" cannot be dropped");
        let outcome = deprovision(&mut session, &identity("alice"));

        assert!(!outcome.committed);
        assert_eq!(
            outcome.first_failure.as_deref(),
            Some("drop user: role \"alice\" cannot be dropped")
        );
    }
}
