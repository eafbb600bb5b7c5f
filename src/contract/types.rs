//! Contract types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract prediction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Prediction {
    Rise,
    Higher,
    Fall,
    Lower,
    Over,
    Under,
    Even,
    Odd,
    Matches,
    Differs,
    /// Any kind this engine does not settle; never winning
    #[serde(other)]
    Unknown,
}

impl Prediction {
    /// Whether settlement compares the last digit against a barrier
    pub fn needs_barrier(self) -> bool {
        matches!(
            self,
            Prediction::Over | Prediction::Under | Prediction::Matches | Prediction::Differs
        )
    }

    /// Feed contract type code for this prediction
    pub fn contract_type(self) -> &'static str {
        match self {
            Prediction::Rise | Prediction::Higher => "CALL",
            Prediction::Fall | Prediction::Lower => "PUT",
            Prediction::Over => "DIGITOVER",
            Prediction::Under => "DIGITUNDER",
            Prediction::Even => "DIGITEVEN",
            Prediction::Odd => "DIGITODD",
            Prediction::Matches => "DIGITMATCH",
            Prediction::Differs => "DIGITDIFF",
            Prediction::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Prediction::Rise => "RISE",
            Prediction::Higher => "HIGHER",
            Prediction::Fall => "FALL",
            Prediction::Lower => "LOWER",
            Prediction::Over => "OVER",
            Prediction::Under => "UNDER",
            Prediction::Even => "EVEN",
            Prediction::Odd => "ODD",
            Prediction::Matches => "MATCHES",
            Prediction::Differs => "DIFFERS",
            Prediction::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl FromStr for Prediction {
    type Err = String;

    /// Case-insensitive; `UNKNOWN` is not accepted as input
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prediction = match s.to_ascii_uppercase().as_str() {
            "RISE" => Prediction::Rise,
            "HIGHER" => Prediction::Higher,
            "FALL" => Prediction::Fall,
            "LOWER" => Prediction::Lower,
            "OVER" => Prediction::Over,
            "UNDER" => Prediction::Under,
            "EVEN" => Prediction::Even,
            "ODD" => Prediction::Odd,
            "MATCHES" => Prediction::Matches,
            "DIFFERS" => Prediction::Differs,
            _ => return Err(format!("unknown prediction: {s}")),
        };
        Ok(prediction)
    }
}

/// How a contract's duration is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    /// Duration counts ticks after entry
    Ticks,
    /// Duration is seconds after entry
    Time,
}

/// Position lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Won,
    Lost,
}

impl PositionStatus {
    pub fn is_settled(self) -> bool {
        !matches!(self, PositionStatus::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_deserialize() {
        let p: Prediction = serde_json::from_str("\"OVER\"").unwrap();
        assert_eq!(p, Prediction::Over);
        let p: Prediction = serde_json::from_str("\"DIFFERS\"").unwrap();
        assert_eq!(p, Prediction::Differs);
    }

    #[test]
    fn test_unrecognized_prediction_is_unknown() {
        let p: Prediction = serde_json::from_str("\"TOUCH\"").unwrap();
        assert_eq!(p, Prediction::Unknown);
    }

    #[test]
    fn test_prediction_from_str() {
        assert_eq!("over".parse::<Prediction>(), Ok(Prediction::Over));
        assert_eq!("Rise".parse::<Prediction>(), Ok(Prediction::Rise));
        assert!("touch".parse::<Prediction>().is_err());
        assert!("unknown".parse::<Prediction>().is_err());
    }

    #[test]
    fn test_needs_barrier() {
        assert!(Prediction::Over.needs_barrier());
        assert!(Prediction::Matches.needs_barrier());
        assert!(!Prediction::Even.needs_barrier());
        assert!(!Prediction::Rise.needs_barrier());
    }

    #[test]
    fn test_contract_type_codes() {
        assert_eq!(Prediction::Rise.contract_type(), "CALL");
        assert_eq!(Prediction::Lower.contract_type(), "PUT");
        assert_eq!(Prediction::Matches.contract_type(), "DIGITMATCH");
        assert_eq!(Prediction::Differs.contract_type(), "DIGITDIFF");
    }

    #[test]
    fn test_status_settled() {
        assert!(!PositionStatus::Open.is_settled());
        assert!(PositionStatus::Won.is_settled());
        assert!(PositionStatus::Lost.is_settled());
    }

    #[test]
    fn test_display_roundtrips_serde_name() {
        let json = serde_json::to_string(&Prediction::Higher).unwrap();
        assert_eq!(json, format!("\"{}\"", Prediction::Higher));
    }
}
