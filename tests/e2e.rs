use std::io::Write;
use std::path::Path;
use std::process::Command;

use chrono::{Datelike, Utc};

fn run_path(path: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_payflow"))
        .arg(path)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// December of next year, so fixture cards never expire.
fn expiry() -> String {
    format!("12{:02}", (Utc::now().year() + 1) % 100)
}

/// Run a fixture with `{expiry}` filled in.
fn run(fixture: &str) -> (String, String, bool) {
    let template = std::fs::read_to_string(format!("tests/fixtures/{fixture}"))
        .expect("failed to read fixture");

    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(template.replace("{expiry}", &expiry()).as_bytes())
        .expect("failed to write temp file");

    run_path(file.path())
}

/// (card_number, state, acquiring_state) per output row, sorted; ids are random.
fn outcomes(stdout: &str) -> Vec<(String, String, String)> {
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("id,state,amount,currency,card_number,expiry_date,card_holder,cvv,acquiring_state")
    );

    let mut rows: Vec<_> = lines
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 9, "{line}");
            (
                fields[4].to_string(),
                fields[1].to_string(),
                fields[8].to_string(),
            )
        })
        .collect();
    rows.sort();
    rows
}

fn row(card: &str, state: &str, acquiring: &str) -> (String, String, String) {
    (card.to_string(), state.to_string(), acquiring.to_string())
}

#[test]
fn valid_requests() {
    let (stdout, stderr, success) = run("valid.csv");

    assert!(success);
    assert!(stderr.is_empty(), "{stderr}");

    assert_eq!(
        outcomes(&stdout),
        vec![
            row("************1111", "rejected", "rejected"),
            row("************3063", "action_required", "3ds_required"),
            row("************3097", "rejected", "rejected"),
            row("************3220", "paid", "confirmed"),
            row("************4242", "paid", "confirmed"),
            row("************7726", "refunded", "refunded"),
        ]
    );
}

#[test]
fn card_data_is_masked() {
    let (stdout, _, success) = run("valid.csv");
    let expiry = expiry();

    assert!(success);
    assert!(!stdout.contains("4242424242424242"));
    assert!(stdout.contains(&format!(",GBP,************4242,{expiry},John Doe,***,")));
    assert!(stdout.contains(&format!(",USD,************3063,{expiry},Erika Fox,****,")));
}

#[test]
fn wrong_challenge_response_rejects() {
    let (stdout, stderr, success) = run("wrong_token.csv");

    assert!(success);
    assert!(stderr.is_empty(), "{stderr}");
    assert_eq!(
        outcomes(&stdout),
        vec![row("************3220", "rejected", "rejected")]
    );
}

#[test]
fn errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv");

    assert!(success);
    assert!(stderr.contains("failed to parse row"));
    assert!(stderr.contains("amount 0 is outside"));
    assert!(stderr.contains("card expired"));
    assert!(stderr.contains("currency 'gbp'"));

    assert_eq!(
        outcomes(&stdout),
        vec![row("************4444", "paid", "confirmed")]
    );
}

#[test]
fn missing_input_fails() {
    let (stdout, stderr, success) = run_path(Path::new("tests/fixtures/does_not_exist.csv"));

    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("failed to open csv file"));
}
