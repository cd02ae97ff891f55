//! Normalisation of untrusted backend payloads into canonical rows.
//!
//! The backend contract is a `{ success, data }` envelope, but individual fields
//! arrive under inconsistent aliases (`ts` vs `timestamp` vs `time`, `value` vs
//! `close`) and numbers are sometimes encoded as strings. All of that aliasing
//! is reconciled here, at one seam, via per-endpoint [`FieldMap`] tables; after
//! normalisation every row carries canonical field names and finite floats only.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::FetchError;

/// Epoch values at or above this magnitude are milliseconds, below are seconds.
const EPOCH_MS_THRESHOLD: f64 = 1e12;

/// Extract the payload from a response body.
///
/// Accepts the standard `{ success, data }` envelope or a bare JSON array
/// (implicit success). `success: false` is a recoverable backend failure,
/// handled identically to a non-2xx status by callers. A body that is neither
/// shape, or an envelope missing `data`, is malformed.
pub fn parse_envelope(body: &str, endpoint: &str) -> Result<Value, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| FetchError::MalformedResponse(error.to_string()))?;

    match value {
        Value::Array(_) => Ok(value),
        Value::Object(mut object) => {
            let success = object
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if !success {
                return Err(FetchError::Backend {
                    endpoint: endpoint.to_string(),
                });
            }
            object.remove("data").ok_or_else(|| {
                FetchError::MalformedResponse(format!(
                    "envelope missing `data` field for {endpoint}"
                ))
            })
        }
        other => Err(FetchError::MalformedResponse(format!(
            "expected envelope or array, got {other}"
        ))),
    }
}

/// Row ordering required by the consumer.
///
/// Charts want ascending time; "latest value" tables want descending. The sort
/// is an explicit pipeline step, never an assumption about backend ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Per-endpoint alias table mapping source field names to canonical ones.
///
/// The canonical name itself is always accepted; `aliases` lists the historical
/// variants observed from the backend.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    /// Accepted names for the row timestamp.
    pub timestamp: &'static [&'static str],
    /// `(canonical, aliases)` per metric field.
    pub fields: &'static [(&'static str, &'static [&'static str])],
    /// Canonical field a row must carry to survive normalisation.
    pub primary: &'static str,
}

/// Canonical row shape: a timestamp plus named finite metric values.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub time: DateTime<Utc>,
    pub fields: IndexMap<SmolStr, f64>,
}

impl NormalizedRow {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }
}

/// Coerce a JSON value to a finite float.
///
/// Accepts numbers and numeric strings; everything else, including NaN and
/// infinities, is rejected so downstream metrics never see poisoned values.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) if !raw.trim().is_empty() => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|float| float.is_finite())
}

/// Reconcile the backend's timestamp encodings: epoch seconds, epoch
/// milliseconds, numeric strings of either, or RFC 3339 strings.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Value::String(raw) = value {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(raw.trim()) {
            return Some(datetime.with_timezone(&Utc));
        }
    }

    let epoch = coerce_f64(value)?;
    if epoch.abs() >= EPOCH_MS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch as i64)
    } else {
        DateTime::from_timestamp(epoch as i64, 0)
    }
}

fn resolve_field<'a>(row: &'a serde_json::Map<String, Value>, canonical: &str, aliases: &[&str]) -> Option<&'a Value> {
    row.get(canonical)
        .or_else(|| aliases.iter().find_map(|alias| row.get(*alias)))
}

/// Normalise an endpoint payload into canonical rows.
///
/// Rows without a resolvable timestamp, or whose primary metric field is
/// non-numeric after coercion, are dropped. The requested sort is always
/// applied.
pub fn normalize_rows(data: &Value, map: &FieldMap, sort: SortOrder) -> Vec<NormalizedRow> {
    let items: &[Value] = match data {
        Value::Array(items) => items,
        single @ Value::Object(_) => std::slice::from_ref(single),
        _ => return Vec::new(),
    };

    let mut rows: Vec<NormalizedRow> = items
        .iter()
        .filter_map(|item| {
            let object = item.as_object()?;

            let time = map
                .timestamp
                .iter()
                .find_map(|alias| object.get(*alias))
                .and_then(parse_timestamp)?;

            let mut fields = IndexMap::new();
            for (canonical, aliases) in map.fields {
                if let Some(value) = resolve_field(object, canonical, aliases) {
                    if let Some(float) = coerce_f64(value) {
                        fields.insert(SmolStr::new(*canonical), float);
                    }
                }
            }

            if !fields.contains_key(map.primary) {
                return None;
            }

            Some(NormalizedRow { time, fields })
        })
        .collect();

    match sort {
        SortOrder::Ascending => rows.sort_by_key(|row| row.time),
        SortOrder::Descending => {
            rows.sort_by_key(|row| std::cmp::Reverse(row.time));
        }
    }

    rows
}

/// Extract the primary metric series from normalised rows, preserving order.
pub fn primary_series(rows: &[NormalizedRow], map: &FieldMap) -> Vec<f64> {
    rows.iter().filter_map(|row| row.get(map.primary)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FUNDING_MAP: FieldMap = FieldMap {
        timestamp: &["timestamp", "ts", "time"],
        fields: &[
            ("funding_rate", &["value", "rate"]),
            ("volume", &["volume_quote", "vol"]),
        ],
        primary: "funding_rate",
    };

    #[test]
    fn test_envelope_standard_shape() {
        let data = parse_envelope(r#"{"success": true, "data": [1, 2]}"#, "history").unwrap();
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn test_envelope_bare_array_accepted() {
        let data = parse_envelope(r#"[{"ts": 1}]"#, "history").unwrap();
        assert!(data.is_array());
    }

    #[test]
    fn test_envelope_success_false_is_backend_failure() {
        let error = parse_envelope(r#"{"success": false, "data": []}"#, "history").unwrap_err();
        assert!(matches!(error, FetchError::Backend { .. }));
    }

    #[test]
    fn test_envelope_missing_data_is_malformed() {
        let error = parse_envelope(r#"{"success": true}"#, "history").unwrap_err();
        assert!(matches!(error, FetchError::MalformedResponse(_)));

        let error = parse_envelope("not json at all", "history").unwrap_err();
        assert!(matches!(error, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn test_aliases_reconciled_and_strings_coerced() {
        let data = json!([
            {"ts": 1700000000, "value": "0.012", "volume_quote": 1500.0},
            {"timestamp": 1700003600000i64, "rate": 0.018},
        ]);

        let rows = normalize_rows(&data, &FUNDING_MAP, SortOrder::Ascending);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("funding_rate"), Some(0.012));
        assert_eq!(rows[0].get("volume"), Some(1500.0));
        assert_eq!(rows[1].get("funding_rate"), Some(0.018));
        assert_eq!(rows[1].get("volume"), None);
    }

    #[test]
    fn test_non_numeric_primary_rows_dropped() {
        let data = json!([
            {"ts": 1700000000, "value": "n/a"},
            {"ts": 1700003600, "value": 0.02},
            {"ts": 1700007200, "volume": 10.0},
        ]);

        let rows = normalize_rows(&data, &FUNDING_MAP, SortOrder::Ascending);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("funding_rate"), Some(0.02));
    }

    #[test]
    fn test_sort_is_explicit_both_ways() {
        let data = json!([
            {"ts": 1700003600, "value": 2.0},
            {"ts": 1700000000, "value": 1.0},
            {"ts": 1700007200, "value": 3.0},
        ]);

        let ascending = normalize_rows(&data, &FUNDING_MAP, SortOrder::Ascending);
        let series: Vec<f64> = primary_series(&ascending, &FUNDING_MAP);
        assert_eq!(series, vec![1.0, 2.0, 3.0]);

        let descending = normalize_rows(&data, &FUNDING_MAP, SortOrder::Descending);
        let series: Vec<f64> = primary_series(&descending, &FUNDING_MAP);
        assert_eq!(series, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_timestamp_encodings() {
        let seconds = parse_timestamp(&json!(1700000000)).unwrap();
        let millis = parse_timestamp(&json!(1700000000000i64)).unwrap();
        let string = parse_timestamp(&json!("1700000000")).unwrap();
        let rfc3339 = parse_timestamp(&json!("2023-11-14T22:13:20Z")).unwrap();

        assert_eq!(seconds, millis);
        assert_eq!(seconds, string);
        assert_eq!(seconds, rfc3339);
        assert!(parse_timestamp(&json!("soon")).is_none());
    }

    #[test]
    fn test_single_object_payload_wrapped() {
        let data = json!({"ts": 1700000000, "value": 0.5});
        let rows = normalize_rows(&data, &FUNDING_MAP, SortOrder::Ascending);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_coerce_rejects_non_finite() {
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!("inf")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!(" 1.5 ")), Some(1.5));
    }
}
