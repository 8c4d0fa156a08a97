//! Defensive parsing of the fleet-status response body.
//!
//! Depending on backend version the fleet-status endpoint returns one of
//! three shapes: a bare array of device records, `{"data": [...]}`, or the
//! full envelope `{"success": true, "data": [...]}`. Anything else is an
//! explicit unrecognized-shape error; callers keep their previous snapshot
//! rather than clearing to empty.

use serde_json::Value;

use frostwatch_types::{coerce_flag, RawDeviceRecord};

use crate::ApiError;

/// The accepted fleet-status body shapes.
#[derive(Debug)]
enum FleetBody {
    Bare(Vec<Value>),
    Enveloped { success: Option<Value>, data: Vec<Value> },
}

fn classify(body: Value) -> Result<FleetBody, ApiError> {
    match body {
        Value::Array(rows) => Ok(FleetBody::Bare(rows)),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => Ok(FleetBody::Enveloped {
                success: map.remove("success"),
                data: rows,
            }),
            Some(other) => Err(ApiError::Shape(format!(
                "'data' is {}, expected an array",
                type_name(&other)
            ))),
            None => Err(ApiError::Shape(
                "object without a 'data' array".to_string(),
            )),
        },
        other => Err(ApiError::Shape(format!(
            "expected an array or an object, got {}",
            type_name(&other)
        ))),
    }
}

/// Parse a fleet-status body into raw device records.
///
/// An empty array is a valid "no devices" result, not an error.
pub fn parse_fleet_body(body: Value) -> Result<Vec<RawDeviceRecord>, ApiError> {
    let rows = match classify(body)? {
        FleetBody::Bare(rows) => rows,
        FleetBody::Enveloped { success, data } => {
            // Only {success: true} envelopes are blessed; a reported failure
            // is an error even when records are attached.
            if let Some(flag) = success {
                if !coerce_flag(&flag) {
                    return Err(ApiError::Backend(
                        "fleet status envelope reported success=false".to_string(),
                    ));
                }
            }
            data
        }
    };

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| ApiError::Parse(format!("device record: {e}")))
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "machineName": "IDM-01",
            "lastUpdate": "2026-08-01T12:00:00Z",
            "recordId": 17,
            "hasNewData": 1,
            "machineStatus": "1",
            "coolingStatus": true,
            "internetStatus": 0,
        })
    }

    #[test]
    fn accepts_bare_array() {
        let records = parse_fleet_body(json!([record()])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].machine_name.as_deref(), Some("IDM-01"));
    }

    #[test]
    fn accepts_data_wrapper() {
        let records = parse_fleet_body(json!({ "data": [record()] })).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn accepts_success_envelope() {
        let body = json!({ "success": true, "data": [record(), record()] });
        let records = parse_fleet_body(body).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn empty_array_is_a_valid_empty_fleet() {
        assert!(parse_fleet_body(json!([])).unwrap().is_empty());
        assert!(parse_fleet_body(json!({ "data": [] })).unwrap().is_empty());
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        assert!(matches!(
            parse_fleet_body(json!("nope")),
            Err(ApiError::Shape(_))
        ));
        assert!(matches!(
            parse_fleet_body(json!({ "devices": [] })),
            Err(ApiError::Shape(_))
        ));
        assert!(matches!(
            parse_fleet_body(json!({ "data": "not-an-array" })),
            Err(ApiError::Shape(_))
        ));
    }

    #[test]
    fn rejects_reported_failure_envelope() {
        let body = json!({ "success": false, "data": [record()] });
        assert!(matches!(parse_fleet_body(body), Err(ApiError::Backend(_))));
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let records = parse_fleet_body(json!([{ "machineStatus": 1 }])).unwrap();
        assert_eq!(records[0].machine_name, None);
        assert_eq!(records[0].record_id, None);
    }
}
