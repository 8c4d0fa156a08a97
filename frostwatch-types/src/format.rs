//! Display formatting for raw register values.
//!
//! The dashboard shows temperature and pressure readings with one decimal
//! place while everything else (percentages, hours, counters) rounds to a
//! whole number. That asymmetry is a domain convention the operators expect;
//! keep it exactly as specified here.

use serde_json::Value;

/// Format a raw reading with its unit suffix.
///
/// Rules, in order:
/// - `null` formats as `"--"` with no unit.
/// - Strings that parse as numbers are treated as numbers; any other string
///   is passed through with the unit appended.
/// - Zero readings keep a unit-specific number of decimals: `"0.00"` for
///   degree units, `"0.0"` for bar, plain `"0"` otherwise.
/// - Non-zero degree/bar readings are fixed to one decimal place.
/// - Every other numeric reading rounds half-up toward positive infinity to
///   the nearest integer.
///
/// # Example
///
/// ```rust
/// use frostwatch_types::format_value;
/// use serde_json::json;
///
/// assert_eq!(format_value(&json!(0), "°C"), "0.00°C");
/// assert_eq!(format_value(&json!(0), "bar"), "0.0bar");
/// assert_eq!(format_value(&json!(2.5), "%"), "3%");
/// assert_eq!(format_value(&json!("defrost"), ""), "defrost");
/// ```
pub fn format_value(value: &Value, unit: &str) -> String {
    match value {
        Value::Null => "--".to_string(),
        Value::Number(n) => format_number(n.as_f64().unwrap_or(0.0), unit),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => format_number(n, unit),
            Err(_) => format!("{}{}", s, unit),
        },
        Value::Bool(b) => format!("{}{}", b, unit),
        other => format!("{}{}", other, unit),
    }
}

/// Format an optional reading; a missing value formats as `"--"`.
pub fn format_optional(value: Option<&Value>, unit: &str) -> String {
    match value {
        Some(v) => format_value(v, unit),
        None => "--".to_string(),
    }
}

fn format_number(n: f64, unit: &str) -> String {
    let is_degree = unit.contains('°');
    let is_pressure = unit.contains("bar");

    if n == 0.0 {
        if is_degree {
            format!("0.00{}", unit)
        } else if is_pressure {
            format!("0.0{}", unit)
        } else {
            format!("0{}", unit)
        }
    } else if is_degree || is_pressure {
        format!("{:.1}{}", n, unit)
    } else {
        // Half rounds toward positive infinity: 2.5 -> 3, -2.5 -> -2.
        let rounded = (n + 0.5).floor();
        format!("{}{}", rounded as i64, unit)
    }
}
