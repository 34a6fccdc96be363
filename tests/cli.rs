use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const STATEMENT: &str = "\
Period,Category,Note,IDR,Type
01/03/2024,Coffee,Morning coffee,35000,Expense
02/03/2024,Salary,March pay,9000000,Income
03/03/2024,coffee,Afternoon coffee,30000,Expense
";

fn rekap(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rekap").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn init(home: &Path) {
    rekap(home)
        .args(["init", "--data-dir"])
        .arg(home.join("data"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 10 default categories"));
}

#[test]
fn test_import_requires_init() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("march.csv");
    std::fs::write(&file, STATEMENT).unwrap();
    rekap(home.path())
        .arg("import")
        .arg(&file)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rekap init"));
}

#[test]
fn test_import_then_export_csv() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    let file = home.path().join("march.csv");
    std::fs::write(&file, STATEMENT).unwrap();
    rekap(home.path())
        .arg("import")
        .arg(&file)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 transactions imported"))
        .stdout(predicate::str::contains("Will be created: coffee"));

    let out = home.path().join("out.csv");
    rekap(home.path())
        .args(["export", "--format", "csv", "--output"])
        .arg(&out)
        .assert()
        .success();
    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Period,Category,Note,Amount,Type");
    assert_eq!(lines[1], "03/03/2024,Coffee,Afternoon coffee,30000,Expense");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_import_declined_writes_nothing() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    let file = home.path().join("march.csv");
    std::fs::write(&file, STATEMENT).unwrap();
    rekap(home.path())
        .arg("import")
        .arg(&file)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Import cancelled."));

    rekap(home.path())
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Coffee").not());
}

#[test]
fn test_unsupported_file_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    let file = home.path().join("statement.pdf");
    std::fs::write(&file, "%PDF").unwrap();
    rekap(home.path())
        .arg("import")
        .arg(&file)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_receipt_import() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    let file = home.path().join("scan.json");
    std::fs::write(
        &file,
        r#"{"date": "05/03/2024", "amount": 42000, "description": "Lunch", "category": "Food & Drink", "type": "expense"}"#,
    )
    .unwrap();
    rekap(home.path())
        .arg("receipt")
        .arg(&file)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 transactions imported"));
}
