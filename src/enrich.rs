//! Sample enrichment - the pure JSON half of the pipeline
//!
//! Takes the raw text collected from `intel_gpu_top -J`, validates its outer
//! shape, and rewrites the first sample into a Telegraf-friendly record. The
//! payload schema itself is opaque: engine names, units and whatever else the
//! tool reports pass through untouched.
//!
//! ## Shape contract
//!
//! The tool accumulates a JSON array of sample objects on stdout and closes
//! the array when interrupted. Anything that is not a non-empty array with an
//! object first element is rejected; the agent schema downstream expects one
//! flat record per tick.

use chrono::Utc;
use serde_json::Value;

use crate::error::{Error, Result};

/// Key injected into the record holding the capture time (ns since epoch).
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Key injected into the record naming the metric source for Telegraf.
pub const MEASUREMENT_KEY: &str = "measurement_name";

/// Current wall-clock time as integer nanoseconds since the Unix epoch.
///
/// Saturates at `i64::MAX` past the year 2262 instead of panicking.
#[must_use]
pub fn timestamp_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Parse one collected sample and return it as an enriched, pretty-printed
/// JSON document.
///
/// The first element of the array gains two keys: [`TIMESTAMP_KEY`] holding
/// `timestamp_ns` and [`MEASUREMENT_KEY`] holding `measurement_name`. If the
/// payload already carries a key of either name it is overwritten - the tool
/// has never emitted one, and Telegraf needs ours to win if it ever does.
///
/// # Errors
///
/// Returns [`Error::MalformedJson`] when `raw` is not valid JSON, and
/// [`Error::UnexpectedShape`] when it is valid JSON but not a non-empty array
/// whose first element is an object.
pub fn enrich_sample(raw: &str, timestamp_ns: i64, measurement_name: &str) -> Result<String> {
    let parsed: Value = serde_json::from_str(raw).map_err(|source| Error::MalformedJson {
        raw: raw.to_string(),
        source,
    })?;

    let Value::Array(mut samples) = parsed else {
        return Err(Error::UnexpectedShape {
            raw: raw.to_string(),
        });
    };
    if samples.is_empty() {
        return Err(Error::UnexpectedShape {
            raw: raw.to_string(),
        });
    }

    // Only the first sample survives; the 500ms window should not have
    // produced more than one anyway.
    let Value::Object(mut record) = samples.swap_remove(0) else {
        return Err(Error::UnexpectedShape {
            raw: raw.to_string(),
        });
    };

    record.insert(TIMESTAMP_KEY.to_string(), Value::from(timestamp_ns));
    record.insert(
        MEASUREMENT_KEY.to_string(),
        Value::from(measurement_name),
    );

    serde_json::to_string_pretty(&Value::Object(record)).map_err(|source| Error::MalformedJson {
        raw: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_SAMPLE: &str = r#"[{"period": {"duration": 52.31, "unit": "ms"},
        "rc6": {"value": 100.0, "unit": "%"},
        "power": {"GPU": 0.0, "Package": 4.17, "unit": "W"}}]"#;

    #[test]
    fn test_enrich_injects_both_keys() {
        let doc = enrich_sample(ONE_SAMPLE, 1_234_567_890, "intel_gpu_top").unwrap();
        let record: Value = serde_json::from_str(&doc).unwrap();

        assert_eq!(record[TIMESTAMP_KEY], Value::from(1_234_567_890_i64));
        assert_eq!(record[MEASUREMENT_KEY], Value::from("intel_gpu_top"));
    }

    #[test]
    fn test_enrich_preserves_payload_fields() {
        let doc = enrich_sample(ONE_SAMPLE, 0, "intel_gpu_top").unwrap();
        let record: Value = serde_json::from_str(&doc).unwrap();

        assert_eq!(record["period"]["unit"], Value::from("ms"));
        assert_eq!(record["power"]["Package"], Value::from(4.17));
        // payload keys + exactly the two injected keys
        assert_eq!(record.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_enrich_takes_first_element_only() {
        let raw = r#"[{"sample": 1}, {"sample": 2}]"#;
        let doc = enrich_sample(raw, 0, "intel_gpu_top").unwrap();
        let record: Value = serde_json::from_str(&doc).unwrap();

        assert_eq!(record["sample"], Value::from(1));
    }

    #[test]
    fn test_enrich_overwrites_colliding_keys() {
        // Existing behavior, kept on purpose: injected metadata wins.
        let raw = r#"[{"timestamp": "theirs", "measurement_name": "theirs"}]"#;
        let doc = enrich_sample(raw, 99, "intel_gpu_top").unwrap();
        let record: Value = serde_json::from_str(&doc).unwrap();

        assert_eq!(record[TIMESTAMP_KEY], Value::from(99));
        assert_eq!(record[MEASUREMENT_KEY], Value::from("intel_gpu_top"));
        assert_eq!(record.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_enrich_rejects_invalid_json() {
        let err = enrich_sample("not valid json", 0, "intel_gpu_top").unwrap_err();
        assert!(matches!(err, Error::MalformedJson { .. }));
        assert!(format!("{err}").contains("not valid json"));
    }

    #[test]
    fn test_enrich_rejects_object() {
        let err = enrich_sample(r#"{"key": "value"}"#, 0, "intel_gpu_top").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { .. }));
    }

    #[test]
    fn test_enrich_rejects_empty_array() {
        let err = enrich_sample("[]", 0, "intel_gpu_top").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { .. }));
    }

    #[test]
    fn test_enrich_rejects_scalar() {
        let err = enrich_sample("42", 0, "intel_gpu_top").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { .. }));
    }

    #[test]
    fn test_enrich_rejects_non_object_first_element() {
        let err = enrich_sample("[1, 2, 3]", 0, "intel_gpu_top").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { .. }));
    }

    #[test]
    fn test_output_is_valid_json() {
        let doc = enrich_sample(ONE_SAMPLE, 0, "intel_gpu_top").unwrap();
        assert!(serde_json::from_str::<Value>(&doc).is_ok());
    }

    #[test]
    fn test_timestamp_ns_is_recent() {
        // 2020-01-01 in ns; anything earlier means the clock source broke
        let ts = timestamp_ns();
        assert!(ts > 1_577_836_800_000_000_000);
    }
}
