use crate::db::{self, PersistedRecord};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

/// Coerce and insert. No validation rules are re-run here; import trusts the
/// caller's filtering and only the persisted shape is enforced.
pub fn import_rows(conn: &Connection, rows: &[Map<String, Value>]) -> anyhow::Result<usize> {
    let records = rows
        .iter()
        .map(PersistedRecord::from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
    db::insert_records(conn, &records)
}

/// `data.import`: bulk insert a caller-filtered set of rows for one sheet.
fn handle_data_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let sheet_name = req
        .params
        .get("sheetName")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let rows: Vec<Map<String, Value>> = match req.params.get("data").and_then(|v| v.as_array()) {
        Some(data) if !data.is_empty() => data
            .iter()
            .map(|v| v.as_object().cloned().unwrap_or_default())
            .collect(),
        _ => return err(&req.id, "no_data", "No data to import", None),
    };

    match import_rows(conn, &rows) {
        Ok(n) => ok(
            &req.id,
            json!({
                "message": format!("{} rows imported successfully.", n),
                "inserted": n,
            }),
        ),
        Err(e) => {
            log::error!("import failed for sheet {sheet_name:?}: {e:?}");
            err(&req.id, "import_failed", "Failed to import data", None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "data.import" => Some(handle_data_import(state, req)),
        _ => None,
    }
}
