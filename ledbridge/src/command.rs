//! LED commands and their wire encoding.
//!
//! A command is an action paired with an LED. On the wire it is the
//! concatenation of both tokens (`on1`, `off3`, ...) followed by a newline.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Switch an LED on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Turn the LED on.
    On,
    /// Turn the LED off.
    Off,
}

impl Action {
    /// Wire token for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Whether this action leaves the LED lit.
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// One of the three LEDs wired to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedId {
    /// LED "1".
    One,
    /// LED "2".
    Two,
    /// LED "3".
    Three,
}

impl LedId {
    /// All LEDs in display order.
    pub const ALL: [Self; 3] = [Self::One, Self::Two, Self::Three];

    /// Identifier used on the wire and in the status payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
        }
    }

    /// Zero-based slot index.
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "1" => Some(Self::One),
            "2" => Some(Self::Two),
            "3" => Some(Self::Three),
            _ => None,
        }
    }
}

impl fmt::Display for LedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated LED command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    /// What to do.
    pub action: Action,
    /// Which LED to do it to.
    pub led: LedId,
}

impl Command {
    /// Every command the controller understands.
    pub const ALL: [Self; 6] = [
        Self::new(Action::On, LedId::One),
        Self::new(Action::Off, LedId::One),
        Self::new(Action::On, LedId::Two),
        Self::new(Action::Off, LedId::Two),
        Self::new(Action::On, LedId::Three),
        Self::new(Action::Off, LedId::Three),
    ];

    /// Create a command.
    pub const fn new(action: Action, led: LedId) -> Self {
        Self { action, led }
    }

    /// Bytes written to the serial port, newline included.
    pub fn to_wire(self) -> Vec<u8> {
        format!("{self}\n").into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.action.as_str(), self.led.as_str())
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Exact match against the six known tokens.
    fn from_str(s: &str) -> Result<Self> {
        let parsed = if let Some(led) = s.strip_prefix("off") {
            LedId::from_token(led).map(|led| Self::new(Action::Off, led))
        } else if let Some(led) = s.strip_prefix("on") {
            LedId::from_token(led).map(|led| Self::new(Action::On, led))
        } else {
            None
        };

        parsed.ok_or_else(|| Error::InvalidCommand(s.to_string()))
    }
}
