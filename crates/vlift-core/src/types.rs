/*!
 * Core data types for vlift.
 *
 * This module defines the identifier and hardware-selection types shared
 * by the hardware and engine crates.
 */
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for vlift resources
///
/// Identifies devices, shuttles, operations and session holders. Stable
/// external keys (a shuttle name, a measuring-device id) convert with
/// `Id::from`; transient resources get a random UUID with `Id::new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(String);

impl Id {
    /// Create a new ID with a random UUID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an ID from a string
    pub fn from_string<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_string())
    }

    /// Get the string representation of the ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self::from_string(uuid.to_string())
    }
}

/// The hardware family driving a physical device
///
/// Selects the protocol driver used to talk to the device. `Simulation`
/// performs no network I/O and is the default for newly configured devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareKind {
    /// No hardware attached; commands are logged and reported successful
    Simulation,
    /// Kardex vertical lift family (pipe-delimited CR-LF protocol)
    Kardex,
}

impl Default for HardwareKind {
    fn default() -> Self {
        HardwareKind::Simulation
    }
}

impl HardwareKind {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareKind::Simulation => "simulation",
            HardwareKind::Kardex => "kardex",
        }
    }
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
