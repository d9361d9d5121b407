use chrono::Datelike;
use rust_xlsxwriter::Workbook;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_ledgerd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn ledgerd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(resp: &serde_json::Value) -> &str {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn error_message(resp: &serde_json::Value) -> &str {
    resp.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// A date inside the current month, since the date rule is wall-clock
/// relative.
fn current_month_date() -> String {
    let today = chrono::Local::now().date_naive();
    format!("15-{:02}-{}", today.month(), today.year())
}

/// Three data rows on one sheet; the first data row (spreadsheet row 2) has
/// Amount -1, the other two are importable.
fn write_fixture(path: &std::path::Path) {
    let date = current_month_date();
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Sheet1").expect("sheet name");
    for (col, header) in ["Name", "Amount", "Date", "Verified"].iter().enumerate() {
        ws.write_string(0, col as u16, *header).expect("header");
    }
    let rows = [
        ("Alice", -1.0, "Yes"),
        ("Bob", 120.5, "Yes"),
        ("Carol", 75.0, "No"),
    ];
    for (i, (name, amount, verified)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        ws.write_string(r, 0, *name).expect("name");
        ws.write_number(r, 1, *amount).expect("amount");
        ws.write_string(r, 2, date.as_str()).expect("date");
        ws.write_string(r, 3, *verified).expect("verified");
    }
    wb.save(path).expect("save fixture");
}

#[test]
fn upload_validates_and_import_persists() {
    let workspace = temp_dir("ledgerd-roundtrip");
    let fixture = workspace.join("expenses.xlsx");
    write_fixture(&fixture);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let uploaded = request(
        &mut stdin,
        &mut reader,
        "2",
        "file.upload",
        json!({ "path": fixture.to_string_lossy() }),
    );
    assert_eq!(uploaded.get("ok").and_then(|v| v.as_bool()), Some(true));
    let result = uploaded.get("result").expect("result");
    assert!(result
        .get("validatedAt")
        .and_then(|v| v.as_str())
        .is_some());
    assert_eq!(result["sheetsWithErrors"], json!(["Sheet1"]));

    let sheet = &result["sheets"]["Sheet1"];
    assert_eq!(sheet["data"].as_array().map(|a| a.len()), Some(3));
    let issues = sheet["validationResults"].as_array().expect("issues");
    assert_eq!(issues.len(), 1, "exactly one issue: {issues:?}");
    assert_eq!(issues[0]["row"], json!(2));
    assert_eq!(
        issues[0]["message"],
        json!("Amount must be numeric and greater than zero")
    );

    let count = request(&mut stdin, &mut reader, "3", "records.count", json!({}));
    assert_eq!(count["result"]["count"], json!(0));

    // Import the two rows the validator let through.
    let valid_rows: Vec<serde_json::Value> = sheet["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter(|row| row["Name"] != json!("Alice"))
        .cloned()
        .collect();
    let imported = request(
        &mut stdin,
        &mut reader,
        "4",
        "data.import",
        json!({ "sheetName": "Sheet1", "data": valid_rows }),
    );
    assert_eq!(imported.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        imported["result"]["message"],
        json!("2 rows imported successfully.")
    );

    let count = request(&mut stdin, &mut reader, "5", "records.count", json!({}));
    assert_eq!(count["result"]["count"], json!(2));

    let listed = request(
        &mut stdin,
        &mut reader,
        "6",
        "records.list",
        json!({ "limit": 10 }),
    );
    let records = listed["result"]["records"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Name"], json!("Bob"));
    assert_eq!(records[0]["Amount"], json!(120.5));
    assert_eq!(records[1]["Verified"], json!("No"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn empty_import_payload_never_reaches_the_store() {
    let workspace = temp_dir("ledgerd-empty-import");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "data.import",
        json!({ "sheetName": "Sheet1", "data": [] }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&resp), "no_data");
    assert_eq!(error_message(&resp), "No data to import");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "data.import",
        json!({ "sheetName": "Sheet1" }),
    );
    assert_eq!(error_code(&resp), "no_data");

    let count = request(&mut stdin, &mut reader, "4", "records.count", json!({}));
    assert_eq!(count["result"]["count"], json!(0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn upload_failures_map_to_the_error_taxonomy() {
    let workspace = temp_dir("ledgerd-upload-errors");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Missing file parameter.
    let resp = request(&mut stdin, &mut reader, "1", "file.upload", json!({}));
    assert_eq!(error_code(&resp), "no_file");
    assert_eq!(error_message(&resp), "No file uploaded");

    // Nonexistent path.
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "file.upload",
        json!({ "path": workspace.join("nope.xlsx").to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), "no_file");

    // Wrong extension.
    let csv = workspace.join("data.csv");
    std::fs::write(&csv, "Name,Amount\n").expect("write csv");
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "file.upload",
        json!({ "path": csv.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), "file_rejected");
    assert_eq!(error_message(&resp), "Only Excel files are allowed");

    // Right extension, corrupt content.
    let corrupt = workspace.join("corrupt.xlsx");
    std::fs::write(&corrupt, b"not a workbook at all").expect("write corrupt");
    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "file.upload",
        json!({ "path": corrupt.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), "processing_failed");
    assert_eq!(error_message(&resp), "Error processing file");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
