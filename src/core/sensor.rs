use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

use serde_json::{Map, Value};

use crate::core::{derived::Derived, path::extract_f64};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Unit {
    Watts,
    WattHours,
    Percent,
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Watts => write!(f, "W"),
            Self::WattHours => write!(f, "Wh"),
            Self::Percent => write!(f, "%"),
        }
    }
}

/// First matching keyword wins, so the percentages must go before `charge`.
const UNIT_KEYWORDS: &[(&str, Unit)] = &[
    ("power", Unit::Watts),
    ("rate", Unit::Percent),
    ("efficiency", Unit::Percent),
    ("stateofcharge", Unit::Percent),
    ("charge", Unit::WattHours),
    ("capacity", Unit::WattHours),
    ("production", Unit::WattHours),
    ("consumption", Unit::WattHours),
    ("supply", Unit::WattHours),
    ("grid", Unit::WattHours),
    ("photovoltaic", Unit::WattHours),
];

/// Guess the unit from the payload key.
#[must_use]
pub fn classify(path: &str) -> Option<Unit> {
    let path = path.to_lowercase();
    UNIT_KEYWORDS.iter().find(|(keyword, _)| path.contains(keyword)).map(|(_, unit)| *unit)
}

/// Collect the numeric leaves of the payload as `(dotted path, value)` pairs.
///
/// Of an array, only the first element is visited, and only when it is an object.
#[must_use]
pub fn flatten(payload: &Value) -> Vec<(String, f64)> {
    let mut leaves = Vec::new();
    if let Value::Object(object) = payload {
        flatten_into(object, None, &mut leaves);
    }
    leaves
}

fn flatten_into(object: &Map<String, Value>, prefix: Option<&str>, leaves: &mut Vec<(String, f64)>) {
    for (key, value) in object {
        let path = prefix.map_or_else(|| key.clone(), |prefix| format!("{prefix}.{key}"));
        match value {
            Value::Object(child) => flatten_into(child, Some(&path), leaves),
            Value::Array(items) => {
                if let Some(Value::Object(first)) = items.first() {
                    flatten_into(first, Some(&format!("{path}.0")), leaves);
                }
            }
            Value::Number(number) => {
                if let Some(number) = number.as_f64() {
                    leaves.push((path, number));
                }
            }
            Value::Null | Value::Bool(_) | Value::String(_) => {}
        }
    }
}

/// Read a payload key, scaling fractional rates to percent.
///
/// The vendor reports some rates as `0..=1` and others as `0..=100`.
#[must_use]
pub fn read_key(payload: &Value, path: &str) -> Option<f64> {
    let value = extract_f64(payload, path)?;
    if is_rate(path) && (0.0..=1.0).contains(&value) { Some(value * 100.0) } else { Some(value) }
}

fn is_rate(path: &str) -> bool {
    path.to_lowercase().replace('_', "").ends_with("rate")
}

#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub enum Sensor {
    /// Payload leaf discovered at start-up.
    Key { path: String, unit: Option<Unit> },

    /// Value calculated from several payload leaves.
    Derived(Derived),
}

impl Sensor {
    pub fn key(path: impl Into<String>) -> Self {
        let path = path.into();
        let unit = classify(&path);
        Self::Key { path, unit }
    }

    /// Discover the payload keys, followed by the derived sensors.
    pub fn discover(payload: &Value) -> Vec<Self> {
        flatten(payload)
            .into_iter()
            .map(|(path, _)| Self::key(path))
            .chain(Derived::ALL.into_iter().map(Self::Derived))
            .collect()
    }

    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::Key { path, .. } => Cow::Borrowed(path.as_str()),
            Self::Derived(derived) => Cow::Owned(derived.to_string()),
        }
    }

    #[must_use]
    pub const fn unit(&self) -> Option<Unit> {
        match self {
            Self::Key { unit, .. } => *unit,
            Self::Derived(derived) => Some(derived.unit()),
        }
    }

    #[must_use]
    pub fn value(&self, payload: &Value) -> Option<f64> {
        match self {
            Self::Key { path, .. } => read_key(payload, path),
            Self::Derived(derived) => derived.value(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rate_normalization() {
        const KEY: &str = "selfSufficiencyRate";
        assert_eq!(read_key(&json!({ KEY: 0.42 }), KEY), Some(42.0));
        assert_eq!(read_key(&json!({ KEY: 75 }), KEY), Some(75.0));
        assert_eq!(read_key(&json!({ KEY: 1.5 }), KEY), Some(1.5));
        assert_eq!(read_key(&json!({ KEY: 1 }), KEY), Some(100.0));
        assert_eq!(read_key(&json!({ KEY: 0 }), KEY), Some(0.0));
    }

    #[test]
    fn test_rate_normalization_ignores_underscores_and_case() {
        let payload = json!({ "stats": { "self_consumption_RATE": 0.5 } });
        assert_eq!(read_key(&payload, "stats.self_consumption_RATE"), Some(50.0));
    }

    #[test]
    fn test_no_normalization_for_other_keys() {
        let payload = json!({ "battery": { "stateOfCharge": 0.5 }, "rates": { "power": 0.5 } });
        assert_eq!(read_key(&payload, "battery.stateOfCharge"), Some(0.5));
        assert_eq!(read_key(&payload, "rates.power"), Some(0.5));
    }

    #[test]
    fn test_read_missing_key() {
        assert_eq!(read_key(&json!({}), "selfSufficiencyRate"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("battery.power"), Some(Unit::Watts));
        assert_eq!(classify("selfSufficiencyRate"), Some(Unit::Percent));
        assert_eq!(classify("battery.stateOfCharge"), Some(Unit::Percent));
        assert_eq!(classify("battery.remainingCharge"), Some(Unit::WattHours));
        assert_eq!(classify("directConsumption"), Some(Unit::WattHours));
        assert_eq!(classify("grid"), Some(Unit::WattHours));
        assert_eq!(classify("heatPumps.0.temperature"), None);
    }

    #[test]
    fn test_flatten() {
        let payload = json!({
            "production": 1520,
            "battery": { "power": -350.5, "model": "X" },
            "heatPumps": [{ "power": 900 }, { "power": 100 }],
            "phases": [230, 231, 229],
            "isOnline": true,
            "missing": null
        });
        let mut leaves = flatten(&payload);
        leaves.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        assert_eq!(
            leaves,
            vec![
                ("battery.power".to_string(), -350.5),
                ("heatPumps.0.power".to_string(), 900.0),
                ("production".to_string(), 1520.0),
            ]
        );
    }

    #[test]
    fn test_flatten_non_object() {
        assert!(flatten(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_discover() {
        let sensors = Sensor::discover(&json!({ "selfSufficiencyRate": 0.9 }));
        assert_eq!(sensors.len(), 1 + Derived::ALL.len());
        assert_eq!(sensors[0].name(), "selfSufficiencyRate");
        assert_eq!(sensors[0].unit(), Some(Unit::Percent));
        assert_eq!(sensors[0].value(&json!({ "selfSufficiencyRate": 0.9 })), Some(90.0));
    }
}
