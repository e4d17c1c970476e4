//! Plugin parameters and typed accessors with defaults.

use std::collections::BTreeMap;

/// Free-form constructor parameters, as read from configuration.
///
/// `BTreeMap` keeps key order deterministic for serialization and hashing.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Extract a named f64 parameter, falling back to `default`.
pub fn param_f64(params: &Params, name: &str, default: f64) -> f64 {
    params
        .get(name)
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(default)
}

/// Extract a named usize parameter, falling back to `default`.
///
/// Accepts integers and whole non-negative floats (`20` or `20.0`).
pub fn param_usize(params: &Params, name: &str, default: usize) -> usize {
    match params.get(name) {
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .or_else(|| {
                v.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as usize)
            })
            .unwrap_or(default),
        None => default,
    }
}

/// Extract a named bool parameter, falling back to `default`.
pub fn param_bool(params: &Params, name: &str, default: bool) -> bool {
    params
        .get(name)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

/// Extract a named string parameter, falling back to `default`.
pub fn param_str<'a>(params: &'a Params, name: &str, default: &'a str) -> &'a str {
    params
        .get(name)
        .and_then(serde_json::Value::as_str)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Params {
        let mut p = Params::new();
        p.insert("period".into(), json!(14));
        p.insert("window".into(), json!(20.0));
        p.insert("threshold".into(), json!(1.5));
        p.insert("latest_only".into(), json!(true));
        p.insert("field".into(), json!("volume"));
        p
    }

    #[test]
    fn typed_accessors_read_values() {
        let p = params();
        assert_eq!(param_usize(&p, "period", 0), 14);
        assert_eq!(param_usize(&p, "window", 0), 20);
        assert_eq!(param_f64(&p, "threshold", 0.0), 1.5);
        assert_eq!(param_f64(&p, "period", 0.0), 14.0);
        assert!(param_bool(&p, "latest_only", false));
        assert_eq!(param_str(&p, "field", "close"), "volume");
    }

    #[test]
    fn missing_or_mistyped_values_fall_back() {
        let p = params();
        assert_eq!(param_usize(&p, "absent", 7), 7);
        assert_eq!(param_usize(&p, "threshold", 7), 7);
        assert!(!param_bool(&p, "period", false));
        assert_eq!(param_str(&p, "period", "close"), "close");
    }
}
