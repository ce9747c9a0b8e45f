//! Loose value comparison.
//!
//! Settings diffs omit any value that loosely equals its default, so `"300"`
//! matches a default of `300` and `""` matches `false`. Comparison follows the
//! CMS host's scripting semantics closely enough for configuration values:
//! booleans compare by truthiness, numeric strings compare numerically, and
//! containers compare element-wise.

use serde_json::Value;

/// Truthiness of a settings value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn numeric(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Loose equality between two settings values.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Bool(x), other) | (other, Bool(x)) => *x == is_truthy(other),
        (Null, Null) => true,
        (Null, String(s)) | (String(s), Null) => s.is_empty(),
        (Null, other) | (other, Null) => !is_truthy(other),
        (Number(x), Number(y)) => x.as_f64() == y.as_f64(),
        (Number(n), String(s)) | (String(s), Number(n)) => match numeric(s) {
            Some(f) => n.as_f64() == Some(f),
            None => n.to_string() == *s,
        },
        (String(x), String(y)) => match (numeric(x), numeric(y)) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        (Array(x), Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_eq(l, r))
        }
        (Object(x), Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        (Array(x), Object(y)) | (Object(y), Array(x)) => {
            x.len() == y.len()
                && x.iter().enumerate().all(|(i, v)| {
                    y.get(&i.to_string())
                        .is_some_and(|other| loose_eq(v, other))
                })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert!(loose_eq(&json!(300), &json!("300")));
        assert!(loose_eq(&json!(""), &json!(false)));
        assert!(loose_eq(&json!(true), &json!("yes")));
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(loose_eq(&json!("1e2"), &json!("100")));
        assert!(!loose_eq(&json!("oxide"), &json!("oxide-dark")));
        assert!(!loose_eq(&json!(null), &json!("0")));
        assert!(!loose_eq(&json!(1), &json!("one")));
    }

    #[test]
    fn containers() {
        assert!(loose_eq(&json!({"a": [1, 2]}), &json!({"a": ["1", 2]})));
        assert!(!loose_eq(&json!({"a": 1}), &json!({"b": 1})));
        assert!(loose_eq(&json!(["x"]), &json!({"0": "x"})));
        assert!(!loose_eq(&json!([1, 2]), &json!([1])));
    }
}
