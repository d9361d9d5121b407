use rusqlite::Connection;
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("ledger.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            verified TEXT NOT NULL CHECK (verified IN ('Yes','No'))
        )",
        [],
    )?;

    Ok(conn)
}

/// One imported row in its persisted shape. Insert-only; nothing in the
/// system updates or deletes these after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub verified: String,
}

impl PersistedRecord {
    /// Coerce an uploaded row record into the persisted shape. The store is
    /// the last line of defense here: import trusts the client's filtering
    /// and re-runs no validation rules, so a malformed row fails the whole
    /// batch the same way a store rejection would.
    pub fn from_row(row: &Map<String, Value>) -> anyhow::Result<PersistedRecord> {
        let name = scalar_string(row.get("Name"))
            .ok_or_else(|| anyhow::anyhow!("row is missing Name"))?;
        let amount = match row.get("Amount") {
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("Amount is not representable as a number"))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow::anyhow!("Amount {:?} is not numeric", s))?,
            _ => anyhow::bail!("row is missing Amount"),
        };
        let date = scalar_string(row.get("Date"))
            .ok_or_else(|| anyhow::anyhow!("row is missing Date"))?;
        let verified = match row.get("Verified").and_then(|v| v.as_str()) {
            Some("Yes") => "Yes".to_string(),
            Some("No") => "No".to_string(),
            _ => anyhow::bail!("Verified must be Yes or No"),
        };

        Ok(PersistedRecord {
            name,
            amount,
            date,
            verified,
        })
    }
}

fn scalar_string(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Bulk insert. Deliberately not wrapped in a transaction: a mid-batch
/// failure leaves earlier rows in place while the caller reports the whole
/// batch as failed, matching the documented import contract.
pub fn insert_records(conn: &Connection, records: &[PersistedRecord]) -> anyhow::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO records(id, name, amount, date, verified) VALUES(?, ?, ?, ?, ?)",
    )?;
    for r in records {
        stmt.execute((
            Uuid::new_v4().to_string(),
            &r.name,
            r.amount,
            &r.date,
            &r.verified,
        ))?;
    }
    Ok(records.len())
}

pub fn records_count(conn: &Connection) -> anyhow::Result<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    Ok(n)
}
