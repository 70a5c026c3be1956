//! E2E tests for the report, chart and schema commands

use std::path::PathBuf;
use std::process::{Command, Output};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn captax(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_captax"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn report(extra: &[&str]) -> Output {
    let sales = data("sales.csv");
    let cash = data("cash.csv");
    let config = data("config.json");
    let mut args = vec![
        "report",
        "--sales",
        sales.to_str().unwrap(),
        "--cash",
        cash.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    captax(&args)
}

/// Full table with carryforward applied in 2023 and a totals row
#[test]
fn report_table() {
    let output = report(&[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    for year in ["2021", "2022", "2023", "2024", "Total"] {
        assert!(stdout.contains(year), "missing {year} in:\n{stdout}");
    }
    // 2021: 884.50 stock income + 85% of 200 dividend, flat rate
    assert!(stdout.contains("316.35"));
    assert!(stdout.contains("266.35"));
    // 2023: the 2021..2022 net loss of 3880.50 lowers the base to 55999.50
    assert!(stdout.contains("17039.83"));
    assert!(stdout.contains("42840.17"));
    // totals
    assert!(stdout.contains("17356.18"));
    assert!(stdout.contains("38688.32"));
}

#[test]
fn report_csv() {
    let output = report(&["--csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines[0],
        "Year,Deposit,BuyCost,SellCost,LoanInterest,Loss,Profit,Dividend,Income,PaidDividendTax,TotalTax,ResidualTax,NetIncome"
    );
    // four years plus header and totals
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("2021,150"));
    assert!(lines[4].starts_with("2024,1000"));
    assert!(lines[5].starts_with("Total,1150"));
    assert!(lines[5].contains("56044.50"));
}

#[test]
fn report_json() {
    let output = report(&["--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1]["Year"], 2022);
    assert_eq!(rows[1]["TotalTax"], "0");
    assert_eq!(rows[1]["PaidDividendTax"], "30");
    assert_eq!(json["total"]["Year"], "Total");
    assert_eq!(json["total"]["ResidualTax"], "17306.18");
}

/// A single year still carries losses from earlier years
#[test]
fn report_single_year() {
    let output = report(&["--year", "2023"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("17039.83"));
    assert!(!stdout.contains("316.35"));
    assert!(!stdout.contains("2021"));
}

#[test]
fn report_unknown_year_fails() {
    let output = report(&["--year", "1999"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("No data for year 1999"));
}

#[test]
fn report_malformed_row_names_row() {
    let sales = data("sales_malformed.csv");
    let config = data("config.json");
    let output = captax(&[
        "report",
        "--sales",
        sales.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("row 2"), "unexpected error: {stderr}");
}

#[test]
fn report_without_inputs_fails() {
    let output = captax(&["report"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("No input given"));
}

#[test]
fn chart_json_series() {
    let sales = data("sales.csv");
    let cash = data("cash.csv");
    let config = data("config.json");
    let output = captax(&[
        "chart",
        "--sales",
        sales.to_str().unwrap(),
        "--cash",
        cash.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["years"], serde_json::json!([2021, 2022, 2023, 2024]));
    assert_eq!(json["income"][1], -4920.0);
    let tax_2023 = json["total_tax"][2].as_f64().unwrap();
    assert!((tax_2023 - 17039.83).abs() < 1e-6);
}

#[test]
fn chart_written_to_file() {
    let sales = data("sales.csv");
    let config = data("config.json");
    let out = std::env::temp_dir().join(format!("captax-chart-test-{}.html", std::process::id()));
    let output = captax(&[
        "chart",
        "--sales",
        sales.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let html = std::fs::read_to_string(&out).unwrap();
    let _ = std::fs::remove_file(&out);
    assert!(html.contains("<svg"));
    assert!(html.contains(">2023</text>"));
}

#[test]
fn schema_default_config_round_trips() {
    let output = captax(&["schema", "default-config"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tax"]["carryforward_window_years"], 5);
    assert_eq!(json["cash"]["labels"]["dividend"], "OSINKO");
}

#[test]
fn schema_config_schema() {
    let output = captax(&["schema"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("\"title\": \"Config\""));
    assert!(stdout.contains("TaxRules"));
}
