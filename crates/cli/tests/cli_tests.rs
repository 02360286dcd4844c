// Binary-level tests for `pricecheck run / validate / currencies`.
//
// Each test copies the recon fixture sources into a temp dir next to a
// config written for the test, so configured outputs land in the temp dir.
//
// Run with: cargo test -p pricecheck-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use tempfile::TempDir;

const FIXTURE_FILES: &[&str] = &[
    "request.csv",
    "deal_specialist.csv",
    "pricing_engine.csv",
    "rates.toml",
];

fn pricecheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pricecheck"));
    cmd.env_remove("PRICECHECK_RATES");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

/// Temp dir holding the fixture sources and `pricecheck.toml`, which is the
/// fixture config followed by `extra`.
fn workspace(extra: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for file in FIXTURE_FILES {
        fs::copy(fixtures_dir().join(file), dir.path().join(file)).unwrap();
    }
    let base = fs::read_to_string(fixtures_dir().join("pricecheck.toml")).unwrap();
    let config = dir.path().join("pricecheck.toml");
    fs::write(&config, format!("{base}\n{extra}")).unwrap();
    (dir, config)
}

fn run_args(args: &[&str]) -> Output {
    pricecheck().args(args).output().expect("failed to run pricecheck")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

const OUTPUTS: &str = r#"
[output]
merged = "merged.csv"
summary = "summary.csv"
json = "result.json"
"#;

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_accepts_fixture_config() {
    let (_dir, config) = workspace("");
    let out = run_args(&["validate", path_str(&config)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("ok (Fixture pricing review"), "{}", stderr(&out));
}

#[test]
fn validate_rejects_equal_categories() {
    let (_dir, config) = workspace("[commercial_model]\ncategory_a = \"DIA\"\ncategory_b = \"dia\"\n");
    let out = run_args(&["validate", path_str(&config)]);
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("categories must differ"), "{}", stderr(&out));
}

#[test]
fn validate_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_args(&["validate", path_str(&dir.path().join("nope.toml"))]);
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).starts_with("error: "), "{}", stderr(&out));
}

// ===========================================================================
// currencies
// ===========================================================================

#[test]
fn currencies_lists_every_name() {
    let (_dir, config) = workspace("");
    let out = run_args(&["currencies", path_str(&config)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.contains(&"euro -> EUR"), "{stdout}");
    assert!(lines.contains(&"us dollar -> USD"), "{stdout}");
    assert!(lines.contains(&"galleons -> UNMAPPED"), "{stdout}");
    assert!(stderr(&out).contains("1 unmapped"), "{}", stderr(&out));
}

#[test]
fn currencies_json_with_extra_mapping() {
    let (_dir, config) = workspace("[currency.extra]\ngalleons = \"GBP\"\n");
    let out = run_args(&["currencies", path_str(&config), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let entries = json["entries"].as_array().unwrap();
    let galleons = entries.iter().find(|e| e["name"] == "galleons").unwrap();
    assert_eq!(galleons["iso"], "GBP");
    assert!(entries.iter().all(|e| !e["iso"].is_null()));
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_with_static_rates_writes_outputs() {
    let (dir, config) = workspace(OUTPUTS);
    let rates = dir.path().join("rates.toml");
    let out = run_args(&["run", path_str(&config), "--rates", path_str(&rates), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["summary"]["total_rows"], 8);
    assert_eq!(json["summary"]["unmapped_currencies"], 1);
    assert_eq!(json["summary"]["rate_failures"], 0);
    assert_eq!(json["meta"]["config_name"], "Fixture pricing review");

    let summary = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
    assert!(summary.starts_with("id_req,Site_ID_req,City_req,"), "{summary}");
    assert_eq!(summary.lines().count(), 9);

    let merged = fs::read_to_string(dir.path().join("merged.csv")).unwrap();
    assert!(merged.lines().next().unwrap().contains("delta_pe_vs_ds"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("result.json")).unwrap()).unwrap();
    assert_eq!(written["summary"], json["summary"]);

    let err = stderr(&out);
    assert!(err.contains("8 quotations, 7 matched by deal specialist, 8 by pricing engine"), "{err}");
    assert!(err.contains("currency: euro -> EUR"), "{err}");
    assert!(err.contains("currency: us dollar -> USD"), "{err}");
    assert!(err.contains("currency: galleons -> UNMAPPED"), "{err}");
}

#[test]
fn run_output_flag_without_json_keeps_stdout_empty() {
    let (dir, config) = workspace("");
    let rates = dir.path().join("rates.toml");
    let result = dir.path().join("out.json");
    let out = run_args(&[
        "run",
        path_str(&config),
        "--rates",
        path_str(&rates),
        "--output",
        path_str(&result),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(out.stdout.is_empty());

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&result).unwrap()).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 8);
    assert!(stderr(&out).contains(&format!("wrote {}", result.display())));
}

#[test]
fn run_strict_fails_on_unmapped_currency_but_still_writes() {
    let (dir, config) = workspace(OUTPUTS);
    let rates = dir.path().join("rates.toml");
    let out = run_args(&["run", path_str(&config), "--rates", path_str(&rates), "--strict"]);
    assert_eq!(out.status.code(), Some(63), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("1 unmapped currencies, 0 failed rate lookups"));
    assert!(stderr(&out).contains("hint: "));
    assert!(dir.path().join("summary.csv").exists());
}

#[test]
fn run_strict_passes_when_complete() {
    let (dir, config) = workspace("[currency.extra]\ngalleons = \"EUR\"\n");
    let rates = dir.path().join("rates.toml");
    let out = run_args(&["run", path_str(&config), "--rates", path_str(&rates), "--strict"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn run_missing_source_file() {
    let (dir, config) = workspace("");
    fs::remove_file(dir.path().join("deal_specialist.csv")).unwrap();
    let rates = dir.path().join("rates.toml");
    let out = run_args(&["run", path_str(&config), "--rates", path_str(&rates)]);
    assert_eq!(out.status.code(), Some(61));
    assert!(stderr(&out).contains("deal_specialist"), "{}", stderr(&out));
}

#[test]
fn run_missing_mapped_column() {
    let (dir, config) = workspace("");
    fs::write(
        dir.path().join("deal_specialist.csv"),
        "quotation_ID,Commercial Model,Contract Term (month)\nQ-100,B4B,36\n",
    )
    .unwrap();
    let rates = dir.path().join("rates.toml");
    let out = run_args(&["run", path_str(&config), "--rates", path_str(&rates)]);
    assert_eq!(out.status.code(), Some(62));
    assert!(
        stderr(&out).contains("missing column 'Main Access Currency'"),
        "{}",
        stderr(&out)
    );
}

// ===========================================================================
// run against an HTTP rate service
// ===========================================================================

fn rates_section(server: &MockServer) -> String {
    format!(
        "[rates]\nendpoint = \"{}\"\ntimeout_secs = 5\n",
        server.url("/convert")
    )
}

/// Fixture config minus its own `[rates]` table, so the test can supply one.
fn workspace_with_rates(rates: &str) -> (TempDir, PathBuf) {
    let (dir, config) = workspace("");
    let base = fs::read_to_string(&config).unwrap();
    let trimmed = match base.find("[rates]") {
        Some(i) => &base[..i],
        None => base.as_str(),
    };
    fs::write(&config, format!("{trimmed}\n{rates}")).unwrap();
    (dir, config)
}

#[test]
fn run_fetches_each_pair_once_over_http() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/convert")
            .query_param("from", "USD")
            .query_param("to", "EUR");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"success":true,"info":{"rate":0.9},"result":0.9}"#);
    });

    let (_dir, config) = workspace_with_rates(&rates_section(&server));
    let out = run_args(&["run", path_str(&config), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["summary"]["rate_failures"], 0);
    m.assert_hits(1);
}

#[test]
fn run_reports_http_rate_failure() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/convert");
        then.status(503).body("maintenance");
    });

    let (_dir, config) = workspace_with_rates(&rates_section(&server));
    let out = run_args(&["run", path_str(&config), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["summary"]["rate_failures"], 1);
    assert_eq!(json["rate_failures"][0]["from"], "USD");
    assert!(stderr(&out).contains("rate USD->EUR failed: HTTP 503"), "{}", stderr(&out));
    // Failed pair is not retried within the run
    m.assert_hits(1);

    let strict = run_args(&["run", path_str(&config), "--strict"]);
    assert_eq!(strict.status.code(), Some(63));
}
