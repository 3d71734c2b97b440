//! Transit-mode classification
//!
//! Maps `(operator, line reference, optional mode hint)` to a vehicle type
//! for labels and icons. The operator tables are specific to the Bay Area
//! agencies served by 511.org.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Muni line references that are rail even though they are letters
const SF_RAIL_LINES: [&str; 9] = ["N", "T", "L", "M", "K", "J", "S", "E", "F"];

/// Vehicle category derived from line and operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Heavy rail, light rail, metro, streetcar
    Train,
    /// Bus
    Bus,
    /// Could not be determined
    Unknown,
}

impl VehicleType {
    /// Lower-case identifier (`train`, `bus`, `unknown`)
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Bus => "bus",
            Self::Unknown => "unknown",
        }
    }

    /// Material Design icon for this vehicle type
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Train => "mdi:train",
            Self::Bus => "mdi:bus",
            Self::Unknown => "mdi:transit-connection-variant",
        }
    }

    /// Word used in device labels; anything that is not a train reads as a bus
    pub const fn label_word(&self) -> &'static str {
        match self {
            Self::Train => "Train",
            Self::Bus | Self::Unknown => "Bus",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Classify a line into a vehicle type
///
/// A mode hint from the feed wins over the operator tables. Unknown
/// operators without a usable hint yield [`VehicleType::Unknown`].
pub fn classify(operator: &str, line_ref: &str, mode: Option<&str>) -> VehicleType {
    if line_ref.is_empty() {
        return VehicleType::Unknown;
    }

    if let Some(mode) = mode.filter(|m| !m.is_empty()) {
        let mode = mode.to_lowercase();
        if mode.contains("rail") || mode.contains("train") || mode.contains("metro") {
            return VehicleType::Train;
        }
        if mode.contains("bus") {
            return VehicleType::Bus;
        }
    }

    match operator.to_uppercase().as_str() {
        // BART, Caltrain
        "BA" | "CM" => VehicleType::Train,
        // AC Transit, County Connection, SamTrans
        "AC" | "CC" | "SM" => VehicleType::Bus,
        // Muni: letters are rail, numbers are bus
        "SF" => {
            if is_all_digits(line_ref) {
                VehicleType::Bus
            } else if SF_RAIL_LINES.contains(&line_ref.to_uppercase().as_str())
                || line_ref.chars().next().is_some_and(char::is_alphabetic)
            {
                VehicleType::Train
            } else {
                VehicleType::Bus
            }
        },
        // VTA: colored light rail lines and the 900 series
        "SC" => {
            let upper = line_ref.to_uppercase();
            if upper.contains("BLUE") || upper.contains("GREEN") || upper.contains("ORANGE") {
                VehicleType::Train
            } else if is_all_digits(line_ref)
                && line_ref.parse::<u64>().map_or(true, |n| n >= 900)
            {
                VehicleType::Train
            } else {
                VehicleType::Bus
            }
        },
        _ => VehicleType::Unknown,
    }
}
