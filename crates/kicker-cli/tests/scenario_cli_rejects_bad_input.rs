//! Argument validation happens before any database connection is attempted,
//! so these run without `KICKER_DATABASE_URL`.

use predicates::prelude::*;

#[allow(deprecated)]
#[test]
fn sensor_emit_rejects_unknown_kind() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("kicker")?;
    cmd.env_remove(kicker_db::ENV_DB_URL)
        .args(["sensor", "emit", "--kind", "penalty"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown sensor kind"));
    Ok(())
}

#[allow(deprecated)]
#[test]
fn sensor_emit_rejects_bad_timestamp() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("kicker")?;
    cmd.env_remove(kicker_db::ENV_DB_URL)
        .args(["sensor", "emit", "--kind", "kickoff", "--at", "yesterday"]);
    cmd.assert().failure().stderr(predicate::str::contains("--at"));
    Ok(())
}

#[allow(deprecated)]
#[test]
fn missing_database_url_is_reported() -> anyhow::Result<()> {
    let dir = std::env::temp_dir();
    let mut cmd = assert_cmd::Command::cargo_bin("kicker")?;
    cmd.current_dir(&dir)
        .env_remove(kicker_db::ENV_DB_URL)
        .args(["players", "list"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(kicker_db::ENV_DB_URL));
    Ok(())
}
