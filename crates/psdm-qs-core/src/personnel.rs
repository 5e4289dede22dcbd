//! Run personnel (SLAC-only tab) with day counts relative to now.

use crate::error::{QsError, Result};
use crate::value::AttrValue;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

pub const PERSONNEL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MILLIS_PER_DAY: i64 = 86_400_000;

pub type PersonnelEntry = Map<String, Value>;

fn parse_date(entry: &PersonnelEntry, key: &str) -> Result<NaiveDateTime> {
    let raw = entry.get(key).and_then(Value::as_str).unwrap_or_default();
    NaiveDateTime::parse_from_str(raw, PERSONNEL_DATE_FORMAT).map_err(|e| QsError::InvalidValue {
        attribute: key.to_string(),
        value: format!("{raw:?} ({e})"),
    })
}

fn whole_days(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

fn is_set(entry: &PersonnelEntry, key: &str) -> bool {
    entry
        .get(key)
        .map(|v| AttrValue::from(v).is_truthy())
        .unwrap_or(false)
}

/// Adds `daysToStart` / `daysToEnd` to every entry. Entries missing either
/// date get zeros; day counts round toward negative infinity.
pub fn annotate_personnel(entries: &mut [PersonnelEntry], now: NaiveDateTime) -> Result<()> {
    for entry in entries.iter_mut() {
        let (to_start, to_end) = if is_set(entry, "startDate") && is_set(entry, "endDate") {
            let start = parse_date(entry, "startDate")?;
            let end = parse_date(entry, "endDate")?;
            (whole_days(now, start), whole_days(now, end))
        } else {
            (0, 0)
        };
        tracing::debug!(
            start = ?entry.get("startDate"),
            end = ?entry.get("endDate"),
            days_to_start = to_start,
            days_to_end = to_end,
            "annotated personnel entry"
        );
        entry.insert("daysToStart".to_string(), Value::from(to_start));
        entry.insert("daysToEnd".to_string(), Value::from(to_end));
    }
    Ok(())
}
