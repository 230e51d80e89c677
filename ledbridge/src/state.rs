//! Last-commanded LED state.
//!
//! The state reflects the last command issued per LED, not anything the
//! controller confirmed.

use crate::command::{Command, LedId};

/// On/off state of the three LEDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedState {
    states: [bool; 3],
}

impl LedState {
    /// All LEDs off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched command.
    pub fn update(&mut self, command: Command) {
        self.states[command.led.index()] = command.action.is_on();
    }

    /// Last-commanded state of one LED.
    pub fn get(&self, led: LedId) -> bool {
        self.states[led.index()]
    }

    /// Copy of the current mapping.
    pub fn snapshot(&self) -> LedSnapshot {
        LedSnapshot {
            led1: self.states[0],
            led2: self.states[1],
            led3: self.states[2],
        }
    }
}

/// Point-in-time copy of [`LedState`].
///
/// Serializes as `{"1": bool, "2": bool, "3": bool}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedSnapshot {
    /// LED "1".
    #[cfg_attr(feature = "serde", serde(rename = "1"))]
    pub led1: bool,
    /// LED "2".
    #[cfg_attr(feature = "serde", serde(rename = "2"))]
    pub led2: bool,
    /// LED "3".
    #[cfg_attr(feature = "serde", serde(rename = "3"))]
    pub led3: bool,
}

impl LedSnapshot {
    /// State of one LED.
    pub fn get(&self, led: LedId) -> bool {
        match led {
            LedId::One => self.led1,
            LedId::Two => self.led2,
            LedId::Three => self.led3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Action;

    #[test]
    fn test_initial_state_all_off() {
        let state = LedState::new();
        assert_eq!(state.snapshot(), LedSnapshot::default());
        for led in LedId::ALL {
            assert!(!state.get(led));
        }
    }

    #[test]
    fn test_update_touches_only_target_led() {
        for command in Command::ALL {
            for initial in [false, true] {
                let mut state = LedState { states: [initial; 3] };
                state.update(command);

                for led in LedId::ALL {
                    let expected = if led == command.led {
                        command.action == Action::On
                    } else {
                        initial
                    };
                    assert_eq!(state.get(led), expected, "{command} on LED {led}");
                }
            }
        }
    }

    #[test]
    fn test_snapshot_matches_get() {
        let mut state = LedState::new();
        state.update(Command::new(Action::On, LedId::Three));
        let snapshot = state.snapshot();
        for led in LedId::ALL {
            assert_eq!(snapshot.get(led), state.get(led));
        }
        assert!(snapshot.led3);
    }
}
