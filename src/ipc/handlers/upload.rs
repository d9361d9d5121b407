use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::preview::SheetState;
use crate::validate;
use crate::workbook;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;

/// `file.upload`: read the workbook at `params.path`, validate every sheet,
/// answer with the full sheet mapping, and seed the preview session. The
/// whole mapping is returned whether or not any sheet has issues; reacting
/// is the shell's call.
fn handle_file_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = path else {
        return err(&req.id, "no_file", "No file uploaded", None);
    };

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("upload file unreadable {}: {e}", path.display());
            return err(
                &req.id,
                "no_file",
                "No file uploaded",
                Some(json!({ "path": path.to_string_lossy() })),
            );
        }
    };

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    if let Err(msg) = state.preview.select_file(&file_name, bytes.len() as u64) {
        return err(&req.id, "file_rejected", msg, None);
    }
    if let Err(e) = state.preview.begin_upload() {
        return err(&req.id, "bad_state", e.to_string(), None);
    }

    let parsed = match workbook::parse_workbook(&bytes) {
        Ok(v) => v,
        Err(e) => {
            state.preview.upload_failed();
            // Cause stays server-side; the client gets the generic message.
            log::error!("error processing file {}: {e:?}", path.display());
            return err(&req.id, "processing_failed", "Error processing file", None);
        }
    };

    let validated_at = Utc::now().to_rfc3339();
    let mut sheets_json = serde_json::Map::new();
    let mut sheet_states = Vec::new();
    let mut sheets_with_errors = Vec::new();

    for (name, data) in parsed {
        let issues = validate::validate_rows(&data);
        let data_json: Vec<Value> = data.iter().cloned().map(Value::Object).collect();
        if !issues.is_empty() {
            sheets_with_errors.push(name.clone());
        }
        sheets_json.insert(
            name.clone(),
            json!({ "data": data_json, "validationResults": issues.clone() }),
        );
        sheet_states.push(SheetState::from_parsed(name, data, &issues));
    }

    if let Err(e) = state
        .preview
        .finish_upload(sheet_states, validated_at.clone())
    {
        return err(&req.id, "bad_state", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "sheets": sheets_json,
            "validatedAt": validated_at,
            "sheetsWithErrors": sheets_with_errors,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "file.upload" => Some(handle_file_upload(state, req)),
        _ => None,
    }
}
