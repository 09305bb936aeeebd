use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, body: &str) {
    let mut file = std::fs::File::create(dir.path().join(name)).expect("create fixture file");
    write!(file, "{body}").expect("write fixture file");
}

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp workspace");
    write_file(
        &dir,
        "transactions.csv",
        "date,position,reference,quantity,value\n\
         2024-01-08,Acme Fund,T1,10,100\n\
         2024-01-08,Sterling Cash,L1,400,400\n",
    );
    write_file(
        &dir,
        "static.json",
        r#"[
            {"name": "Acme Fund", "ticker": "ACME"},
            {"name": "Sterling Cash", "cash": true}
        ]"#,
    );
    std::fs::create_dir(dir.path().join("prices")).expect("create prices dir");
    write_file(
        &dir,
        "prices/ACME.csv",
        "date,close\n2024-01-08,10\n2024-01-09,11\n2024-01-10,12\n2024-01-11,12\n2024-01-12,13\n",
    );
    dir
}

fn folio_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("folio"));
    cmd.current_dir(dir.path())
        .arg("--as-of")
        .arg("2024-01-13")
        .arg("--output")
        .arg("out");
    cmd
}

#[test]
fn current_holdings_prints_table_and_writes_csv() {
    let dir = setup_workspace();
    let mut cmd = folio_cmd(&dir);
    cmd.arg("current-holdings");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Acme Fund"))
        .stdout(predicate::str::contains("Sterling Cash"))
        // terminal table renders currency cells, not raw numerics
        .stdout(predicate::str::contains("£400.00"))
        .stdout(predicate::str::contains("current_holdings.csv"));

    let csv = std::fs::read_to_string(dir.path().join("out/current_holdings.csv"))
        .expect("report file written");
    assert!(csv.starts_with("Position,First Acquired"));
    assert!(csv.contains("Acme Fund"));
}

#[test]
fn daily_summary_writes_one_row_per_business_day() {
    let dir = setup_workspace();
    let mut cmd = folio_cmd(&dir);
    cmd.arg("daily-summary");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("daily_summary.csv"));

    let csv = std::fs::read_to_string(dir.path().join("out/daily_summary.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6); // header + Mon..Fri
    assert!(lines[1].starts_with("2024-01-08"));
    assert!(lines[5].starts_with("2024-01-12"));
}

#[test]
fn all_report_writes_every_summary_file() {
    let dir = setup_workspace();
    let mut cmd = folio_cmd(&dir);
    cmd.arg("all");

    cmd.assert().success();
    for name in [
        "daily_details",
        "daily_summary",
        "monthly_summary",
        "quarterly_summary",
        "annual_summary",
        "current_holdings",
    ] {
        assert!(
            dir.path().join(format!("out/{name}.csv")).exists(),
            "{name}.csv missing"
        );
    }
}

#[test]
fn forward_projection_honours_fwd_periods() {
    let dir = setup_workspace();
    let mut cmd = folio_cmd(&dir);
    cmd.arg("forward-projection").arg("--fwd-periods").arg("10");

    cmd.assert().success();
    let csv = std::fs::read_to_string(dir.path().join("out/forward_projection.csv")).unwrap();
    assert_eq!(csv.lines().count(), 11); // header + 10 business days
    assert!(csv.lines().nth(1).unwrap().starts_with("2024-01-15")); // next Monday
}

#[test]
fn missing_transactions_file_fails_with_context() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::new(cargo::cargo_bin!("folio"));
    cmd.current_dir(dir.path()).arg("daily-summary");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("transactions"));
}

#[test]
fn unpriced_position_still_reports_at_zero() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "transactions.csv",
        "date,position,reference,quantity,value\n2024-01-08,Mystery,T1,10,100\n",
    );
    write_file(&dir, "static.json", "[]");
    std::fs::create_dir(dir.path().join("prices")).unwrap();

    let mut cmd = folio_cmd(&dir);
    cmd.arg("daily-summary");
    cmd.assert().success();

    let csv = std::fs::read_to_string(dir.path().join("out/daily_summary.csv")).unwrap();
    // market value column holds zero, not an error
    assert!(csv.lines().nth(1).unwrap().contains("0.0000"));
}
