// Record normalization.
//
// All of the forgiving number/label/date handling lives here so that the
// filter and aggregation stages only ever see clean, typed values. Coercion
// happens exactly once, when a raw row becomes an `AdRecord`.
use crate::models::{AdRecord, LoadReport, RawRecord};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

/// Coerce a number or numeric string into a non-negative amount.
///
/// Blank strings, text, `NaN`/infinite values and negatives all become `0`.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_f64_safe(s),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Same rules as `coerce_amount`, truncated to a whole count.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    coerce_amount(value).trunc() as u64
}

/// Trim a categorical label. Blank or non-scalar values are treated as absent.
pub fn normalize_label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a reporting day in `YYYY-MM-DD` form.
///
/// A trailing time component (`2024-01-01T00:00:00Z`, `2024-01-01 08:00`) is
/// ignored; the calendar day is taken as written, with no timezone shift.
pub fn parse_period(value: Option<&Value>) -> Option<NaiveDate> {
    let Value::String(s) = value? else {
        return None;
    };
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (date, rest) = NaiveDate::parse_and_remainder(s, "%Y-%m-%d").ok()?;
    if rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ') {
        Some(date)
    } else {
        None
    }
}

/// Money as a whole number of cents. Sums are taken over cents so that the
/// result does not depend on the order of the records.
pub fn to_cents(amount: f64) -> u64 {
    (amount * 100.0).round() as u64
}

pub fn from_cents(cents: u64) -> f64 {
    cents as f64 / 100.0
}

fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

impl AdRecord {
    /// `None` when the row has no usable reporting day; such a row cannot be
    /// placed in any window or day bucket.
    pub fn from_raw(raw: RawRecord) -> Option<Self> {
        let period_start = parse_period(raw.period_start.as_ref())?;
        Some(Self {
            campaign: normalize_label(raw.campaign.as_ref()).unwrap_or_default(),
            spend: from_cents(to_cents(coerce_amount(raw.spend.as_ref()))),
            leads: coerce_count(raw.leads.as_ref()),
            period_start,
            client: normalize_label(raw.client.as_ref()),
            manager: normalize_label(raw.manager.as_ref()),
            target_cost_per_lead: coerce_amount(raw.target_cost_per_lead.as_ref()),
        })
    }
}

/// Turn the raw rows of one fetch into a fresh snapshot.
///
/// Rows that are not JSON objects are skipped. Rows without a usable
/// reporting day are dropped as well, so every record in a snapshot has a
/// day and counts the same in totals and in the daily series.
pub fn ingest_rows(rows: Vec<Value>) -> (Vec<AdRecord>, LoadReport) {
    let total_rows = rows.len();
    let mut skipped_rows = 0usize;
    let mut undated_rows = 0usize;
    let mut records = Vec::with_capacity(total_rows);

    for (idx, row) in rows.into_iter().enumerate() {
        let raw: RawRecord = match serde_json::from_value(row) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(row = idx, "skipping row: {err}");
                skipped_rows += 1;
                continue;
            }
        };
        match AdRecord::from_raw(raw) {
            Some(record) => records.push(record),
            None => undated_rows += 1,
        }
    }

    if skipped_rows > 0 {
        warn!("{skipped_rows} of {total_rows} rows were not objects and were skipped");
    }
    if undated_rows > 0 {
        warn!("{undated_rows} rows have no valid period start and were dropped");
    }

    let report = LoadReport {
        total_rows,
        loaded_rows: records.len(),
        skipped_rows,
        undated_rows,
    };
    (records, report)
}
