//! Real-world distance units accepted for the reference size.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A recognized distance unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Millimeter,
    Centimeter,
    Decimeter,
    Meter,
    Kilometer,
    Inch,
    Foot,
    Yard,
    Mile,
}

impl DistanceUnit {
    /// Every accepted unit, in the order they are listed to users.
    pub const ALL: [DistanceUnit; 9] = [
        DistanceUnit::Millimeter,
        DistanceUnit::Centimeter,
        DistanceUnit::Decimeter,
        DistanceUnit::Meter,
        DistanceUnit::Kilometer,
        DistanceUnit::Inch,
        DistanceUnit::Foot,
        DistanceUnit::Yard,
        DistanceUnit::Mile,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            DistanceUnit::Millimeter => "millimeter",
            DistanceUnit::Centimeter => "centimeter",
            DistanceUnit::Decimeter => "decimeter",
            DistanceUnit::Meter => "meter",
            DistanceUnit::Kilometer => "kilometer",
            DistanceUnit::Inch => "inch",
            DistanceUnit::Foot => "foot",
            DistanceUnit::Yard => "yard",
            DistanceUnit::Mile => "mile",
        }
    }

    /// Length of one unit in meters.
    pub fn meters(self) -> f64 {
        match self {
            DistanceUnit::Millimeter => 0.001,
            DistanceUnit::Centimeter => 0.01,
            DistanceUnit::Decimeter => 0.1,
            DistanceUnit::Meter => 1.0,
            DistanceUnit::Kilometer => 1000.0,
            DistanceUnit::Inch => 0.0254,
            DistanceUnit::Foot => 0.3048,
            DistanceUnit::Yard => 0.9144,
            DistanceUnit::Mile => 1609.344,
        }
    }

    /// Comma separated list of all unit names, for error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|u| u.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|u| u.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "{} is not a valid unit name. Please choose from the following ones: {}",
                    s,
                    Self::names()
                ))
            })
    }
}
