// Needs a PostgreSQL server on localhost:5432 with the postgres/postgres
// superuser: `cargo test -- --ignored`
use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::io::Write;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile::NamedTempFile;

fn random_name() -> String {
    format!("pga{}", rand::random::<u32>())
}

fn pgaccounts(operation: &str, path: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("pgaccounts").unwrap();
    cmd.env("PGPASSWORD", "postgres")
        .arg(operation)
        .arg("-H")
        .arg("localhost:5432")
        .arg("-U")
        .arg("postgres")
        .arg("-i")
        .arg("2")
        .arg(path);
    cmd
}

#[test]
#[ignore = "requires a running PostgreSQL server"]
fn create_then_delete_accounts() {
    let alice = random_name();
    let bob = format!("7{}", random_name());

    let mut file = NamedTempFile::new().expect("failed to create temp file");
    write!(file, "1,{},secretpw\n2,{},hunter2\n", alice, bob)
        .expect("failed to write to temp file");
    let path = PathBuf::from(file.path().to_str().unwrap());

    pgaccounts("create", &path)
        .arg("-p")
        .arg("3")
        .assert()
        .success()
        .stderr(predicate::str::contains("Connected to database"))
        .stdout(predicate::str::contains(format!("-- account u{} created", bob)))
        .stdout(predicate::str::contains("*** 2 accounts created ***"));

    // Same accounts again: every line fails and rolls back
    pgaccounts("create", &path)
        .arg("-p")
        .arg("3")
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"))
        .stdout(predicate::str::contains("*** 0 accounts created ***"));

    pgaccounts("delete", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("-- account {} deleted", alice)))
        .stdout(predicate::str::contains("*** 2 accounts deleted ***"));

    // Nothing left to delete
    pgaccounts("delete", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("*** 0 accounts deleted ***"));
}

#[test]
#[ignore = "requires a running PostgreSQL server"]
fn connection_failure_is_fatal() {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(b"1,alice,pw\n")
        .expect("failed to write to temp file");
    let path = PathBuf::from(file.path().to_str().unwrap());

    pgaccounts("create", &path)
        .arg("-d")
        .arg("pgaccounts_no_such_database")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connection to database failed"));
}
