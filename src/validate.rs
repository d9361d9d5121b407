use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

const MSG_MANDATORY: &str = "Name, Amount, and Date are mandatory";
const MSG_AMOUNT: &str = "Amount must be numeric and greater than zero";
const MSG_DATE_MONTH: &str = "Date must be valid and within the current month";
const MSG_DATE_FORMAT: &str = "Invalid date format. Use DD-MM-YYYY.";
const MSG_VERIFIED: &str = "Verified must be either Yes or No";

/// One rule violation tied to a spreadsheet row. `row` is the 1-based row
/// number in the sheet: the header occupies row 1, so data row `i` (0-based)
/// reports as `i + 2`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub row: usize,
    pub message: String,
}

/// Validate against the local wall-clock month. The date rule is relative to
/// the moment of the request, so results are a snapshot; callers stamp them
/// with a timestamp rather than treating them as durable.
pub fn validate_rows(rows: &[Map<String, Value>]) -> Vec<ValidationIssue> {
    validate_rows_at(rows, Local::now().date_naive())
}

/// Clock-parameterized form of [`validate_rows`]. Pure over its inputs; all
/// issues for a row are emitted, not just the first.
pub fn validate_rows_at(rows: &[Map<String, Value>], today: NaiveDate) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let sheet_row = i + 2;
        let mut push = |message: &str| {
            issues.push(ValidationIssue {
                row: sheet_row,
                message: message.to_string(),
            })
        };

        if is_falsy(row.get("Name")) || is_falsy(row.get("Amount")) || is_falsy(row.get("Date")) {
            push(MSG_MANDATORY);
        }

        // Presence, not truthiness: Amount = 0 is present and must also fail
        // the range rule, on top of the mandatory rule above.
        if let Some(amount) = row.get("Amount") {
            if !amount.is_null() {
                match numeric_value(amount) {
                    Some(n) if n > 0.0 => {}
                    _ => push(MSG_AMOUNT),
                }
            }
        }

        if let Some(date) = row.get("Date") {
            if !is_falsy(Some(date)) {
                if let Some(message) = check_date(date, today) {
                    push(message);
                }
            }
        }

        if let Some(verified) = row.get("Verified") {
            let accepted = matches!(verified.as_str(), Some("Yes") | Some("No"));
            if !is_falsy(Some(verified)) && !accepted {
                push(MSG_VERIFIED);
            }
        }
    }

    issues
}

fn is_falsy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn numeric_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// DD-MM-YYYY, and the constructed date must land in today's month and year.
/// An impossible date (31-06) fails construction outright rather than
/// rolling over into the next month.
fn check_date(v: &Value, today: NaiveDate) -> Option<&'static str> {
    let raw = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Some(MSG_DATE_FORMAT),
    };

    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() != 3 {
        return Some(MSG_DATE_FORMAT);
    }

    let day = parts[0].trim().parse::<u32>().ok();
    let month = parts[1].trim().parse::<u32>().ok();
    let year = parts[2].trim().parse::<i32>().ok();
    let date = match (day, month, year) {
        (Some(d), Some(m), Some(y)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };

    match date {
        Some(d) if d.month() == today.month() && d.year() == today.year() => None,
        _ => Some(MSG_DATE_MONTH),
    }
}
