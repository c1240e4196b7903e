use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SPA_RECEIPT: &str = r#"```json
{
  "documentType": "Tax Invoice",
  "invoiceNumber": "IV6901-0042",
  "invoiceDate": "11 Jan 2026",
  "sellerName": "Siam Spa",
  "sellerTaxId": "0107566000453",
  "lineItems": [
    {"lineType": "item", "description": "Massage 60 min", "amount": 1200},
    {"lineType": "item", "description": "CN-00123", "amount": -50},
    {"lineType": "discount", "description": "ส่วนลด 10%", "amount": -120}
  ],
  "grandTotal": 1030,
  "confidence": 0.9
}
```"#;

const CAFE_RECEIPT: &str = r#"{"grandTotal": "฿85.00", "confidence": 0.8, "lineItems": []}"#;

/// Command isolated from the user's real config directory.
fn rcpt(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn normalize_prints_canonical_json() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "spa.json", SPA_RECEIPT);

    let output = rcpt(dir.path()).args(["normalize", &input]).output().unwrap();
    assert!(output.status.success());

    let invoice: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(invoice["invoiceDate"], "2026-01-11");
    assert_eq!(invoice["documentType"], "Tax Invoice");
    assert_eq!(invoice["lineItems"].as_array().unwrap().len(), 3);
    assert_eq!(invoice["lineItems"][1]["lineType"], "credit");
    assert_eq!(invoice["lineItems"][2]["lineType"], "discount");
}

#[test]
fn normalize_csv_has_header_and_one_row_per_item() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "spa.json", SPA_RECEIPT);

    let output = rcpt(dir.path())
        .args(["normalize", &input, "--format", "csv", "--user-id", "U1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let mut reader = csv::ReaderBuilder::new().from_reader(output.stdout.as_slice());
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 24);
    assert_eq!(&header[0], "Processed At");
    assert_eq!(&header[23], "User Name");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r[1] == rows[0][1]));
    assert_eq!(&rows[0][3], "202601");
    assert_eq!(&rows[0][22], "U1");
}

#[test]
fn normalize_text_summary() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "cafe.json", CAFE_RECEIPT);

    rcpt(dir.path())
        .args(["normalize", &input, "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:    85.00"))
        .stdout(predicate::str::contains("No line items"));
}

#[test]
fn normalize_reports_validation_warnings() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "bare.json", r#"{"sellerName": "Shop"}"#);

    rcpt(dir.path())
        .args(["normalize", &input])
        .assert()
        .success()
        .stderr(predicate::str::contains("grandTotal: missing"));
}

#[test]
fn normalize_rejects_unreadable_response() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "bad.json", "I cannot read this receipt.");

    rcpt(dir.path())
        .args(["normalize", &input])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid response"));
}

#[test]
fn batch_writes_one_csv() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_spa.json", SPA_RECEIPT);
    write(dir.path(), "b_cafe.json", CAFE_RECEIPT);
    write(dir.path(), "c_broken.json", "not json");
    let pattern = format!("{}/*.json", dir.path().display());
    let out = dir.path().join("rows.csv");

    rcpt(dir.path())
        .args(["batch", &pattern, "--continue-on-error", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("2 successful, 1 failed"));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0][1].ends_with("-001"));
    assert!(rows[3][1].ends_with("-002"));
}

#[test]
fn batch_stops_on_first_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.json", "not json");
    let pattern = format!("{}/*.json", dir.path().display());

    rcpt(dir.path())
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn usage_record_and_show() {
    let dir = TempDir::new().unwrap();
    let ledger = dir.path().join("usage.json");

    for _ in 0..2 {
        rcpt(dir.path())
            .args(["usage", "record", "--ledger"])
            .arg(&ledger)
            .assert()
            .success();
    }

    let output = rcpt(dir.path())
        .args(["usage", "show", "--json", "--ledger"])
        .arg(&ledger)
        .output()
        .unwrap();
    assert!(output.status.success());

    let availability: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(availability["used"], 2);
    assert_eq!(availability["limit"], 450);
    assert_eq!(availability["allowed"], true);
}

#[test]
fn usage_limit_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    let ledger = dir.path().join("usage.json");
    fs::write(&config, r#"{"usage": {"monthly_limit": 1}}"#).unwrap();

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["usage", "record", "--ledger"])
        .arg(&ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("limit of 1 reached"));

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["usage", "show", "--ledger"])
        .arg(&ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("closed"));
}

#[test]
fn config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("rcpt").join("config.json");

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "usage.monthly_limit", "300"])
        .assert()
        .success();

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "usage.monthly_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("300\n"));

    rcpt(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "usage.no_such_key", "1"])
        .assert()
        .failure();
}
