//! Runs the binary against saved pages and checks stdout and exit codes.

use std::path::Path;
use std::process::{Command, Output};

use assert_json_diff::assert_json_include;
use serde_json::{json, Value};

const HOTEL: &str = "https://www.booking.com/hotel/il/lighthouse.html";

fn rate_scout(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rate-scout"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_snapshots(dir: &Path) {
    std::fs::write(
        dir.join("2026-12-01.html"),
        r#"<html><body>
            <table class="hprt-table"><tbody>
              <tr class="hprt-table-row">
                <td><a class="hprt-roomtype-icon-link">Standard Double Room</a></td>
                <td><span class="bui-price-display__value">₪ 620</span></td>
              </tr>
              <tr class="hprt-table-row">
                <td><a class="hprt-roomtype-icon-link">Standard Double Room - Breakfast included</a></td>
                <td><span class="bui-price-display__value">₪ 705</span></td>
              </tr>
            </tbody></table>
        </body></html>"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("2026-12-02.html"),
        "<html><body><p>No availability on our site for your dates.</p></body></html>",
    )
    .unwrap();
}

fn replay_args<'a>(dir: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        HOTEL,
        "2",
        "--start-date",
        "2026-12-01",
        "--snapshot-dir",
        dir,
        "--settle-ms",
        "0",
        "--retry-delay-ms",
        "0",
        "--date-delay-ms",
        "0",
        "--log-level",
        "warn",
    ];
    args.extend_from_slice(extra);
    args
}

#[test]
fn test_replay_success() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshots(dir.path());
    let dir_arg = dir.path().to_str().unwrap();

    let output = rate_scout(&replay_args(dir_arg, &[]));

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    assert_json_include!(
        actual: value,
        expected: json!({
            "success": true,
            "results": [
                {"date": "2026-12-01", "price": 620.0, "currency": "ILS", "room_type": "room_only", "available": true},
                {"date": "2026-12-01", "price": 705.0, "currency": "ILS", "room_type": "with_breakfast", "available": true},
                {"date": "2026-12-02", "price": null, "room_type": "unavailable", "available": false}
            ]
        })
    );
    assert_eq!(value["results"].as_array().unwrap().len(), 3);
}

#[test]
fn test_replay_with_room_type_filter() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshots(dir.path());
    let dir_arg = dir.path().to_str().unwrap();

    let mut args = replay_args(dir_arg, &[]);
    args.insert(2, r#"["with_breakfast"]"#);
    let output = rate_scout(&args);

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["room_type"], "with_breakfast");
    assert_eq!(results[1]["room_type"], "unavailable");
}

#[test]
fn test_missing_snapshot_date_is_error_record() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshots(dir.path());
    let dir_arg = dir.path().to_str().unwrap();

    let mut args = replay_args(dir_arg, &["--max-attempts", "2"]);
    args[1] = "3";
    let output = rate_scout(&args);

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    let last = value["results"].as_array().unwrap().last().cloned().unwrap();
    assert_eq!(last["date"], "2026-12-03");
    assert_eq!(last["room_type"], "error");
    assert!(last["error"].as_str().unwrap().starts_with("navigation failed"));
}

#[test]
fn test_missing_url_is_usage_error() {
    let output = rate_scout(&[]);

    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output);
    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().unwrap().starts_with("usage error"));
    assert!(value.get("results").is_none());
}

#[test]
fn test_invalid_url_is_usage_error() {
    let output = rate_scout(&["booking dot com", "1"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)["success"], false);
}

#[test]
fn test_malformed_room_types_is_usage_error() {
    let output = rate_scout(&[HOTEL, "1", "room_only"]);

    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output);
    assert!(value["error"].as_str().unwrap().contains("JSON array"));
}
