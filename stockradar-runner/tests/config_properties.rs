//! Property tests for configuration validation.
//!
//! 1. Distinct, well-formed strategy names always validate
//! 2. Any repeated strategy name is reported
//! 3. An inverted date range is reported regardless of the dates chosen

use std::path::Path;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stockradar_runner::{ConfigError, PipelineConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,10}"
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn render(names: &[String], range: Option<(NaiveDate, NaiveDate)>) -> String {
    let mut doc = String::from("[data]\npath = \"prices.csv\"\n");
    if let Some((start, end)) = range {
        doc.push_str(&format!("start = \"{start}\"\nend = \"{end}\"\n"));
    }
    for name in names {
        doc.push_str(&format!(
            r#"
[[strategies]]
module = "stockradar.strategies"
class = "FactorScore"
name = "{name}"
"#
        ));
    }
    doc.push_str("\n[output]\npath = \"out\"\n");
    doc
}

fn parse(doc: &str) -> Result<PipelineConfig, ConfigError> {
    PipelineConfig::from_toml(doc, Path::new("prop.toml"))
}

// ── 1–2. Strategy names ──────────────────────────────────────────────

proptest! {
    #[test]
    fn distinct_names_validate(names in prop::collection::btree_set(arb_name(), 1..8)) {
        let names: Vec<String> = names.into_iter().collect();
        let config = parse(&render(&names, None)).unwrap();
        prop_assert_eq!(config.strategies.len(), names.len());
    }

    #[test]
    fn repeated_name_is_reported(
        names in prop::collection::vec(arb_name(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut names = names;
        let dup = names[pick.index(names.len())].clone();
        names.push(dup.clone());

        match parse(&render(&names, None)) {
            Err(ConfigError::Invalid(errors)) => {
                let needle = format!("duplicate strategy name '{dup}'");
                prop_assert!(errors.iter().any(|e| e.contains(&needle)));
            }
            other => prop_assert!(false, "expected Invalid, got {:?}", other),
        }
    }
}

// ── 3. Date range ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn inverted_range_is_reported(a in arb_date(), b in arb_date()) {
        prop_assume!(a != b);
        let (early, late) = if a < b { (a, b) } else { (b, a) };

        let ok = parse(&render(&["s".to_string()], Some((early, late))));
        prop_assert!(ok.is_ok());

        match parse(&render(&["s".to_string()], Some((late, early)))) {
            Err(ConfigError::Invalid(errors)) => {
                prop_assert_eq!(errors.len(), 1);
                prop_assert!(errors[0].contains("is after data.end"));
            }
            other => prop_assert!(false, "expected Invalid, got {:?}", other),
        }
    }
}
