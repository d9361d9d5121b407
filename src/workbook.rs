use anyhow::Context;
use calamine::{Data, Reader, Xlsx};
use serde_json::{Map, Number, Value};
use std::io::Cursor;

/// Parse an xlsx workbook from memory into ordered sheets of row records.
///
/// The first row of each sheet is treated as the header; every later row
/// becomes a record keyed by header name. Empty cells are omitted from the
/// record (an absent key is how "missing" is represented downstream) and
/// fully blank rows are skipped. Sheet order follows the workbook.
pub fn parse_workbook(bytes: &[u8]) -> anyhow::Result<Vec<(String, Vec<Map<String, Value>>)>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("not a readable xlsx workbook")?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("failed to read sheet {name:?}"))?;
        sheets.push((name, range_to_records(&range)));
    }

    Ok(sheets)
}

fn range_to_records(range: &calamine::Range<Data>) -> Vec<Map<String, Value>> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };

    let headers: Vec<Option<String>> = header_row
        .iter()
        .map(|cell| match cell_to_value(cell) {
            Some(Value::String(s)) => {
                let t = s.trim().to_string();
                (!t.is_empty()).then_some(t)
            }
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .collect();

    let mut records = Vec::new();
    for row in rows {
        let mut record = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            let Some(key) = header else { continue };
            if let Some(value) = cell_to_value(cell) {
                record.insert(key.clone(), value);
            }
        }
        if !record.is_empty() {
            records.push(record);
        }
    }
    records
}

fn cell_to_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) => (!s.is_empty()).then(|| Value::String(s.clone())),
        Data::Float(f) => Some(json_number(*f)),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        // Date-formatted cells surface as their raw serial value, the same
        // as a plain numeric cell; text dates come through as strings.
        Data::DateTime(dt) => Some(json_number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(_) => None,
    }
}

/// Whole-valued floats render as JSON integers so a cell authored as `100`
/// round-trips as `100`, not `100.0`.
fn json_number(f: f64) -> Value {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}
