//! Command modes and their response grammar.
//!
//! A [`Mode`] selects which command vocabulary the oracle is asked to produce
//! and the [`ValidationPolicy`] its responses are checked against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// `ALT <aircraft> <altitude>`
    Altitude,
    /// `HDG <aircraft> <heading>`
    #[default]
    Heading,
    /// `SPD <aircraft> <speed>`
    Speed,
    /// `<aircraft>: <heading> <flight level> <latitude> <longitude>`, three lines
    Approach,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Altitude, Mode::Heading, Mode::Speed, Mode::Approach];

    /// Name used in configuration files and prompt template file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Altitude => "altitude",
            Mode::Heading => "heading",
            Mode::Speed => "speed",
            Mode::Approach => "approach",
        }
    }

    pub fn policy(self) -> ValidationPolicy {
        match self {
            Mode::Altitude => ValidationPolicy::prefixed("ALT", 20),
            Mode::Heading => ValidationPolicy::prefixed("HDG", 20),
            Mode::Speed => ValidationPolicy::prefixed("SPD", 20),
            Mode::Approach => ValidationPolicy {
                prefix: None,
                max_line_length: Some(30),
                exact_line_count: Some(3),
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode '{}' (expected altitude, heading, speed or approach)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "altitude" | "alt" => Ok(Mode::Altitude),
            "heading" | "hdg" => Ok(Mode::Heading),
            "speed" | "spd" => Ok(Mode::Speed),
            "approach" | "app" => Ok(Mode::Approach),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Line-oriented grammar checks applied to an oracle response.
///
/// The checks are independent; any combination may be active at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Token every line must start with (case-sensitive).
    #[serde(default)]
    pub prefix: Option<String>,
    /// Maximum characters per line.
    #[serde(default)]
    pub max_line_length: Option<usize>,
    /// Exact number of lines required.
    #[serde(default)]
    pub exact_line_count: Option<usize>,
}

impl ValidationPolicy {
    pub fn prefixed(prefix: &str, max_line_length: usize) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            max_line_length: Some(max_line_length),
            exact_line_count: None,
        }
    }
}
