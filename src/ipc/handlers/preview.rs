use crate::ipc::error::{err, ok};
use crate::ipc::handlers::import;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn state_json(state: &AppState) -> Value {
    let model = &state.preview;
    json!({
        "phase": model.phase().as_str(),
        "fileName": model.file_name(),
        "sheets": model.sheet_names(),
        "activeSheet": model.active_sheet().map(|s| s.name.clone()),
        "rowCount": model.active_sheet().map(|s| s.rows.len()).unwrap_or(0),
        "page": model.page(),
        "pageCount": model.page_count(),
        "canPrev": model.can_prev(),
        "canNext": model.can_next(),
        "validatedAt": model.validated_at(),
    })
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state_json(state))
}

/// Current page of the active sheet, each row with its original spreadsheet
/// row number and full issue list so the shell can highlight without holding
/// any error state of its own.
fn handle_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows: Vec<Value> = state
        .preview
        .page_rows()
        .iter()
        .map(|r| {
            json!({
                "sheetRow": r.sheet_row,
                "record": r.record.clone(),
                "errors": r.errors.clone(),
            })
        })
        .collect();
    ok(&req.id, json!({ "page": state.preview.page(), "rows": rows }))
}

fn handle_select_sheet(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(sheet) = req.params.get("sheet").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.sheet", None);
    };
    match state.preview.select_sheet(sheet) {
        Ok(()) => ok(&req.id, state_json(state)),
        Err(e) => err(&req.id, "unknown_sheet", e.to_string(), None),
    }
}

fn handle_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    match req.params.get("action").and_then(|v| v.as_str()) {
        // Clamped at the bounds, same as the disabled Prev/Next buttons.
        Some("next") => state.preview.next_page(),
        Some("prev") => state.preview.prev_page(),
        _ => return err(&req.id, "bad_params", "action must be next or prev", None),
    }
    ok(&req.id, state_json(state))
}

fn handle_delete_row(state: &mut AppState, req: &Request) -> serde_json::Value {
    if req.params.get("confirm").and_then(|v| v.as_bool()) != Some(true) {
        return err(&req.id, "bad_params", "deletion requires confirmation", None);
    }
    let Some(row) = req.params.get("row").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing params.row", None);
    };
    match state.preview.delete_row(row as usize) {
        Ok(()) => ok(&req.id, state_json(state)),
        Err(e) => err(&req.id, "not_found", e.to_string(), None),
    }
}

/// `preview.import`: filter the working copy down to issue-free rows and
/// send them through the same insert path as `data.import`. An empty
/// filtered set never reaches the store.
fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let payload = match state.preview.import_payload() {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "no_data", msg, None),
    };
    if let Err(e) = state.preview.begin_import() {
        return err(&req.id, "bad_state", e.to_string(), None);
    }

    let result = import::import_rows(conn, &payload.rows);
    state.preview.finish_import();

    match result {
        Ok(n) => ok(
            &req.id,
            json!({
                "sheetName": payload.sheet_name,
                "message": format!("{} rows imported successfully.", n),
                "inserted": n,
            }),
        ),
        Err(e) => {
            log::error!(
                "preview import failed for sheet {:?}: {e:?}",
                payload.sheet_name
            );
            err(&req.id, "import_failed", "Failed to import data", None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "preview.state" => Some(handle_state(state, req)),
        "preview.rows" => Some(handle_rows(state, req)),
        "preview.selectSheet" => Some(handle_select_sheet(state, req)),
        "preview.page" => Some(handle_page(state, req)),
        "preview.deleteRow" => Some(handle_delete_row(state, req)),
        "preview.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
