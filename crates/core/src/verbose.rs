//! Verbosity levels controlling tool-event visibility

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerboseLevel {
    Off,
    On,
    Full,
}

impl VerboseLevel {
    /// Parse a loosely formatted level; `None` means "unset".
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "off" | "false" | "no" | "0" => Some(Self::Off),
            "on" | "true" | "yes" | "1" | "minimal" => Some(Self::On),
            "full" | "all" | "everything" => Some(Self::Full),
            _ => None,
        }
    }

    /// Normalize an optional raw value
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::normalize)
    }

    pub fn shows_tools(self) -> bool {
        !matches!(self, Self::Off)
    }
}
