//! Input latch
//!
//! Key codes from the UI context are mapped onto two 4-bit masks, one for the
//! directional pad and one for the action buttons. The driver snapshots the
//! latch once per tick, so the core never sees a half-applied update.

use bitflags::bitflags;

bitflags! {
    /// Directional pad bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Direction: u8 {
        const RIGHT = 0b0001;
        const LEFT = 0b0010;
        const UP = 0b0100;
        const DOWN = 0b1000;
    }
}

bitflags! {
    /// Action button bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Action: u8 {
        const A = 0b0001;
        const B = 0b0010;
        const SELECT = 0b0100;
        const START = 0b1000;
    }
}

/// A single key code resolved to the mask bit it drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Direction(Direction),
    Action(Action),
}

impl Button {
    /// Resolve a key code (`KeyboardEvent.code` naming) to a button.
    ///
    /// Unrecognized codes resolve to `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let button = match code {
            "KeyD" => Self::Direction(Direction::RIGHT),
            "KeyA" => Self::Direction(Direction::LEFT),
            "KeyW" => Self::Direction(Direction::UP),
            "KeyS" => Self::Direction(Direction::DOWN),
            "KeyK" => Self::Action(Action::A),
            "KeyJ" => Self::Action(Action::B),
            "KeyU" => Self::Action(Action::SELECT),
            "KeyI" => Self::Action(Action::START),
            _ => return None,
        };
        Some(button)
    }
}

/// Input snapshot handed to the core
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub direction: Direction,
    pub action: Action,
}

/// Latched button state, mutated only from the command path
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    state: InputState,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a key event. Returns `false` for codes that map to no button.
    pub fn apply(&mut self, code: &str, pressed: bool) -> bool {
        match Button::from_code(code) {
            Some(button) => {
                self.set(button, pressed);
                true
            }
            None => false,
        }
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Direction(bit) => self.state.direction.set(bit, pressed),
            Button::Action(bit) => self.state.action.set(bit, pressed),
        }
    }

    /// Current state, copied out for one tick
    pub fn snapshot(&self) -> InputState {
        self.state
    }

    pub fn release_all(&mut self) {
        self.state = InputState::default();
    }
}
