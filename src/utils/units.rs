//! Measurement parsing utilities.
//!
//! Link descriptors exported by topology tooling carry numeric attributes
//! either as plain numbers or as strings with a unit suffix
//! (e.g. "12 ms", "0.5%", "10 Gbps"). Only the leading number is kept;
//! units are informational.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

fn measure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*([A-Za-z%/]*)\s*$")
            .expect("measure pattern is valid")
    })
}

/// Parse a measurement string (e.g. "12 ms", "0.5%", "300") to its numeric value
///
/// # Arguments
/// * `value` - The measurement string to parse
///
/// # Returns
/// * `Ok(f64)` - The leading number if parsing succeeds
/// * `Err(String)` - An error message if the string holds no number
///
/// # Examples
/// ```
/// use trafficsim::utils::units::parse_measure;
///
/// assert_eq!(parse_measure("12 ms"), Ok(12.0));
/// assert_eq!(parse_measure("0.5%"), Ok(0.5));
/// assert_eq!(parse_measure("300"), Ok(300.0));
/// assert!(parse_measure("fast").is_err());
/// ```
pub fn parse_measure(value: &str) -> Result<f64, String> {
    let captures = measure_regex()
        .captures(value)
        .ok_or_else(|| format!("Invalid measurement format: '{}'", value))?;

    captures[1]
        .parse::<f64>()
        .map_err(|e| format!("Invalid number in '{}': {}", value, e))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMeasure {
    Number(f64),
    Text(String),
}

/// Serde helper accepting either a number or a string with a unit suffix
pub fn deserialize_measure<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawMeasure::deserialize(deserializer)? {
        RawMeasure::Number(n) => Ok(n),
        RawMeasure::Text(s) => parse_measure(&s).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_measure("42"), Ok(42.0));
        assert_eq!(parse_measure("  3.5 "), Ok(3.5));
        assert_eq!(parse_measure(".25"), Ok(0.25));
        assert_eq!(parse_measure("1e3"), Ok(1000.0));
    }

    #[test]
    fn test_units_are_ignored() {
        assert_eq!(parse_measure("12ms"), Ok(12.0));
        assert_eq!(parse_measure("12 ms"), Ok(12.0));
        assert_eq!(parse_measure("0.01%"), Ok(0.01));
        assert_eq!(parse_measure("10 Mb/s"), Ok(10.0));
    }

    #[test]
    fn test_invalid_measures() {
        assert!(parse_measure("").is_err());
        assert!(parse_measure("ms").is_err());
        assert!(parse_measure("12 ms extra").is_err());
    }

    #[test]
    fn test_deserialize_measure() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "deserialize_measure")]
            delay: f64,
        }

        let probe: Probe = serde_json::from_str(r#"{"delay": "7.5 ms"}"#).unwrap();
        assert_eq!(probe.delay, 7.5);
        let probe: Probe = serde_json::from_str(r#"{"delay": 4}"#).unwrap();
        assert_eq!(probe.delay, 4.0);
        assert!(serde_json::from_str::<Probe>(r#"{"delay": "slow"}"#).is_err());
    }
}
