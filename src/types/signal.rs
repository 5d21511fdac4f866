//! Signal phase, direction group and control mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Colour currently shown by the intersection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    #[default]
    Red,
    Yellow,
    Green,
    /// Every approach held at red.
    AllRed,
}

impl SignalState {
    /// Next state in the fixed cycle red → green → yellow → red.
    ///
    /// `AllRed` re-enters the cycle at green.
    pub const fn next(self) -> Self {
        match self {
            Self::Red | Self::AllRed => Self::Green,
            Self::Green => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    /// True when some approach may proceed.
    pub const fn is_go(self) -> bool {
        matches!(self, Self::Green | Self::Yellow)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::AllRed => "all_red",
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pair of approaches sharing a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DirectionGroup {
    /// North/South
    #[default]
    NS,
    /// East/West
    EW,
}

impl DirectionGroup {
    pub const fn other(self) -> Self {
        match self {
            Self::NS => Self::EW,
            Self::EW => Self::NS,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NS => "North/South",
            Self::EW => "East/West",
        }
    }
}

impl fmt::Display for DirectionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NS => f.write_str("NS"),
            Self::EW => f.write_str("EW"),
        }
    }
}

/// Who drives the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Phase timer advances the cycle.
    #[default]
    Automatic,
    /// Operator commands only; timer ticks are ignored.
    Manual,
    /// All approaches held at red until reset.
    Emergency,
}

impl ControlMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_order() {
        let mut s = SignalState::Red;
        let mut seen = Vec::new();
        for _ in 0..6 {
            s = s.next();
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![
                SignalState::Green,
                SignalState::Yellow,
                SignalState::Red,
                SignalState::Green,
                SignalState::Yellow,
                SignalState::Red,
            ]
        );
        assert_eq!(SignalState::AllRed.next(), SignalState::Green);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&SignalState::AllRed).unwrap(), "\"all_red\"");
        assert_eq!(serde_json::to_string(&DirectionGroup::EW).unwrap(), "\"EW\"");
        assert_eq!(serde_json::to_string(&ControlMode::Manual).unwrap(), "\"manual\"");
        let s: SignalState = serde_json::from_str("\"yellow\"").unwrap();
        assert_eq!(s, SignalState::Yellow);
    }

    #[test]
    fn test_group_other() {
        assert_eq!(DirectionGroup::NS.other(), DirectionGroup::EW);
        assert_eq!(DirectionGroup::EW.other(), DirectionGroup::NS);
    }
}
