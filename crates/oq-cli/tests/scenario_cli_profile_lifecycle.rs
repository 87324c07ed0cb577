//! `oq profile` lifecycle against a scratch local store. No target database
//! required — profile CRUD, activation, and POWER flags are pure local-store
//! operations.

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn store_path(dir: &tempfile::TempDir) -> String {
    dir.path().join("openquery.sqlite").to_string_lossy().to_string()
}

#[test]
fn profile_create_activate_power_delete() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = store_path(&dir);

    let mut create = assert_cmd::Command::cargo_bin("oq")?;
    create
        .env("OQ_STORE_PATH", &store)
        .args([
            "profile", "create", "scratch",
            "--host", "localhost",
            "--database", "app",
            "--user", "app",
        ]);
    create.assert().success().stdout(predicate::str::contains("\"name\": \"scratch\""));

    let mut list = assert_cmd::Command::cargo_bin("oq")?;
    list.env("OQ_STORE_PATH", &store).args(["profile", "list"]);
    list.assert().success().stdout(predicate::str::contains("scratch"));

    let mut activate = assert_cmd::Command::cargo_bin("oq")?;
    activate
        .env("OQ_STORE_PATH", &store)
        .args(["profile", "activate", "scratch"]);
    activate.assert().success();

    let mut power_on = assert_cmd::Command::cargo_bin("oq")?;
    power_on
        .env("OQ_STORE_PATH", &store)
        .args(["profile", "power", "scratch", "--allow-write", "true"]);
    power_on
        .assert()
        .success()
        .stdout(predicate::str::contains("\"allow_write\": true"));

    // Disabling allow_write must force allow_dangerous off too (spec invariant).
    let mut power_on_dangerous = assert_cmd::Command::cargo_bin("oq")?;
    power_on_dangerous
        .env("OQ_STORE_PATH", &store)
        .args(["profile", "power", "scratch", "--allow-dangerous", "true"]);
    power_on_dangerous.assert().success();

    let mut power_off = assert_cmd::Command::cargo_bin("oq")?;
    power_off
        .env("OQ_STORE_PATH", &store)
        .args(["profile", "power", "scratch", "--allow-write", "false"]);
    power_off
        .assert()
        .success()
        .stdout(predicate::str::contains("\"allow_dangerous\": false"));

    let mut audit = assert_cmd::Command::cargo_bin("oq")?;
    audit.env("OQ_STORE_PATH", &store).args(["audit", "list"]);
    audit
        .assert()
        .success()
        .stdout(predicate::str::contains("profile_created"))
        .stdout(predicate::str::contains("profile_activated"))
        .stdout(predicate::str::contains("power_enabled"))
        .stdout(predicate::str::contains("power_disabled"));

    let mut delete = assert_cmd::Command::cargo_bin("oq")?;
    delete.env("OQ_STORE_PATH", &store).args(["profile", "delete", "scratch"]);
    delete.assert().success();

    Ok(())
}

#[test]
fn db_migrate_and_status() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = store_path(&dir);

    let mut migrate = assert_cmd::Command::cargo_bin("oq")?;
    migrate.env("OQ_STORE_PATH", &store).args(["db", "migrate"]);
    migrate.assert().success();

    let mut status = assert_cmd::Command::cargo_bin("oq")?;
    status.env("OQ_STORE_PATH", &store).args(["db", "status"]);
    status
        .assert()
        .success()
        .stdout(predicate::str::contains("\"profile_count\": 0"));

    Ok(())
}

#[test]
fn run_sql_without_active_profile_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = store_path(&dir);

    let mut run = assert_cmd::Command::cargo_bin("oq")?;
    run.env("OQ_STORE_PATH", &store)
        .args(["run", "sql", "SELECT 1"]);
    run.assert().failure();

    Ok(())
}
