//! Touch zones and estimator modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named screen region touched as one step of the tempo cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Up,
    Down,
    Left,
    Right,
}

/// The cycle a performer traces by default: down, left, right, up, wrapping.
pub const DEFAULT_SEQUENCE: [Zone; 4] = [Zone::Down, Zone::Left, Zone::Right, Zone::Up];

impl Zone {
    pub fn name(self) -> &'static str {
        match self {
            Zone::Up => "up",
            Zone::Down => "down",
            Zone::Left => "left",
            Zone::Right => "right",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Zone::Up),
            "down" => Ok(Zone::Down),
            "left" => Ok(Zone::Left),
            "right" => Ok(Zone::Right),
            other => Err(format!("unknown zone '{}'", other)),
        }
    }
}

/// Which estimator currently drives the tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Tempo follows hand speed.
    #[default]
    Motion,
    /// Tempo follows the interval between zone touches.
    Pattern,
}

impl Mode {
    /// The other mode (for the toggle key).
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Motion => Mode::Pattern,
            Mode::Pattern => Mode::Motion,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Motion => "motion",
            Mode::Pattern => "pattern",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "motion" | "1" => Ok(Mode::Motion),
            "pattern" | "2" => Ok(Mode::Pattern),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zones() {
        assert_eq!("down".parse::<Zone>(), Ok(Zone::Down));
        assert_eq!(" LEFT ".parse::<Zone>(), Ok(Zone::Left));
        assert!("middle".parse::<Zone>().is_err());
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(Mode::Motion.toggled(), Mode::Pattern);
        assert_eq!(Mode::Pattern.toggled(), Mode::Motion);
        assert_eq!("2".parse::<Mode>(), Ok(Mode::Pattern));
    }
}
