//! Scaling intents and their replica policy

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A closed set of scaling intents accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAction {
    Up,
    Down,
}

impl ScaleAction {
    /// Replica count written to the values document
    pub fn replicas(self) -> u32 {
        match self {
            Self::Up => 1,
            Self::Down => 0,
        }
    }
}

impl std::fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for ScaleAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(CoreError::UnknownScaleAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_policy() {
        assert_eq!(ScaleAction::Up.replicas(), 1);
        assert_eq!(ScaleAction::Down.replicas(), 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("up".parse::<ScaleAction>().unwrap(), ScaleAction::Up);
        assert_eq!("down".parse::<ScaleAction>().unwrap(), ScaleAction::Down);
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for input in ["", "UP", "Down", "sideways", "1", "up "] {
            assert!(
                matches!(
                    input.parse::<ScaleAction>(),
                    Err(CoreError::UnknownScaleAction(_))
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_json_style() {
        let action: ScaleAction = serde_yaml::from_str("down").unwrap();
        assert_eq!(action, ScaleAction::Down);
        assert!(serde_yaml::from_str::<ScaleAction>("left").is_err());
    }
}
