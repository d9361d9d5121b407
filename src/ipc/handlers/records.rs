use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_records_count(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "count": 0 }));
    };
    match db::records_count(conn) {
        Ok(n) => ok(&req.id, json!({ "count": n })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_records_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "records": [] }));
    };

    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_i64())
        .unwrap_or(100);

    let mut stmt = match conn.prepare(
        "SELECT id, name, amount, date, verified
         FROM records
         ORDER BY rowid
         LIMIT ?",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([limit], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let amount: f64 = row.get(2)?;
            let date: String = row.get(3)?;
            let verified: String = row.get(4)?;
            Ok(json!({
                "id": id,
                "Name": name,
                "Amount": amount,
                "Date": date,
                "Verified": verified
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(records) => ok(&req.id, json!({ "records": records })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.count" => Some(handle_records_count(state, req)),
        "records.list" => Some(handle_records_list(state, req)),
        _ => None,
    }
}
