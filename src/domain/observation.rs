use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Observation-boundary errors
///
/// Every variant is recovered locally: the offending observation is logged
/// and discarded, the zone keeps its previous state, and arbitration still
/// runs over the remaining zones.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("attribute `{0}` is not a finite number")]
    InvalidNumber(&'static str),
    #[error("unknown hvac action: {0}")]
    UnknownHvacAction(String),
    #[error("valve payload is not a number: {0}")]
    InvalidValvePayload(String),
}

/// Reported operating mode of a zone thermostat
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HvacAction {
    Heating,
    Idle,
    Cooling,
    Off,
}

impl std::str::FromStr for HvacAction {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heating" => Ok(HvacAction::Heating),
            "idle" => Ok(HvacAction::Idle),
            "cooling" => Ok(HvacAction::Cooling),
            "off" => Ok(HvacAction::Off),
            _ => Err(ObservationError::UnknownHvacAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for HvacAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HvacAction::Heating => write!(f, "heating"),
            HvacAction::Idle => write!(f, "idle"),
            HvacAction::Cooling => write!(f, "cooling"),
            HvacAction::Off => write!(f, "off"),
        }
    }
}

/// One validated climate observation
///
/// Thermostat state arrives as a loose attribute map; this is the
/// parse-or-reject step that turns it into something the zone controller
/// can consume without re-checking every field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub current_temp: f64,
    pub target_temp: f64,
    pub hvac_action: HvacAction,
}

impl ClimateReading {
    /// Parse a climate entity payload.
    ///
    /// Accepts either the bare attribute map or a state object nesting it
    /// under `attributes`, which is how upstream state-change events arrive.
    pub fn from_payload(payload: &Value) -> Result<Self, ObservationError> {
        let attrs = payload.get("attributes").unwrap_or(payload);

        let current_temp = number_attr(attrs, "current_temperature")?;
        let target_temp = number_attr(attrs, "temperature")?;
        let hvac_action = attrs
            .get("hvac_action")
            .and_then(Value::as_str)
            .ok_or(ObservationError::MissingAttribute("hvac_action"))?
            .parse()?;

        Ok(Self { current_temp, target_temp, hvac_action })
    }
}

fn number_attr(attrs: &Value, key: &'static str) -> Result<f64, ObservationError> {
    let value = attrs
        .get(key)
        .ok_or(ObservationError::MissingAttribute(key))?;
    let n = match value {
        Value::Number(n) => n.as_f64(),
        // Some integrations report numeric attributes as strings.
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ObservationError::InvalidNumber(key)),
    }
}

/// Parse a valve entity payload into an opening percentage.
///
/// Number entities report their state as a bare number or a numeric
/// string; state objects nest it under `state`. Range clamping is the
/// zone controller's job, not the parser's.
pub fn parse_valve_percent(payload: &Value) -> Result<f64, ObservationError> {
    let value = payload.get("state").unwrap_or(payload);
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ObservationError::InvalidValvePayload(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_attribute_map() {
        let payload = json!({
            "current_temperature": 18.0,
            "temperature": 20.0,
            "hvac_action": "heating"
        });
        let reading = ClimateReading::from_payload(&payload).unwrap();
        assert_eq!(reading.current_temp, 18.0);
        assert_eq!(reading.target_temp, 20.0);
        assert_eq!(reading.hvac_action, HvacAction::Heating);
    }

    #[test]
    fn test_parse_nested_state_object() {
        let payload = json!({
            "state": "heat",
            "attributes": {
                "current_temperature": 21.5,
                "temperature": 22.0,
                "hvac_action": "idle"
            }
        });
        let reading = ClimateReading::from_payload(&payload).unwrap();
        assert_eq!(reading.current_temp, 21.5);
        assert_eq!(reading.hvac_action, HvacAction::Idle);
    }

    #[test]
    fn test_parse_stringly_typed_temperatures() {
        let payload = json!({
            "current_temperature": "19.5",
            "temperature": "22",
            "hvac_action": "heating"
        });
        let reading = ClimateReading::from_payload(&payload).unwrap();
        assert_eq!(reading.current_temp, 19.5);
        assert_eq!(reading.target_temp, 22.0);
    }

    #[test]
    fn test_missing_attribute_rejected() {
        let payload = json!({ "temperature": 20.0, "hvac_action": "heating" });
        let err = ClimateReading::from_payload(&payload).unwrap_err();
        assert!(matches!(err, ObservationError::MissingAttribute("current_temperature")));
    }

    #[test]
    fn test_non_numeric_temperature_rejected() {
        let payload = json!({
            "current_temperature": "unavailable",
            "temperature": 20.0,
            "hvac_action": "heating"
        });
        let err = ClimateReading::from_payload(&payload).unwrap_err();
        assert!(matches!(err, ObservationError::InvalidNumber("current_temperature")));
    }

    #[test]
    fn test_unknown_hvac_action_rejected() {
        let payload = json!({
            "current_temperature": 18.0,
            "temperature": 20.0,
            "hvac_action": "defrosting"
        });
        let err = ClimateReading::from_payload(&payload).unwrap_err();
        assert!(matches!(err, ObservationError::UnknownHvacAction(_)));
    }

    #[test]
    fn test_hvac_action_roundtrip() {
        for action in [HvacAction::Heating, HvacAction::Idle, HvacAction::Cooling, HvacAction::Off] {
            assert_eq!(action.to_string().parse::<HvacAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_valve_percent_variants() {
        assert_eq!(parse_valve_percent(&json!(57.0)).unwrap(), 57.0);
        assert_eq!(parse_valve_percent(&json!("42.5")).unwrap(), 42.5);
        assert_eq!(parse_valve_percent(&json!({ "state": "100" })).unwrap(), 100.0);
        assert!(parse_valve_percent(&json!("unknown")).is_err());
        assert!(parse_valve_percent(&json!(null)).is_err());
    }
}
