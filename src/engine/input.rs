use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownAction;

/// Logical input actions. Raw device mapping happens outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Jump,
    Dash,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::MoveLeft => "move_left",
            Self::MoveRight => "move_right",
            Self::Jump => "jump",
            Self::Dash => "dash",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move_left" => Ok(Self::MoveLeft),
            "move_right" => Ok(Self::MoveRight),
            "jump" => Ok(Self::Jump),
            "dash" => Ok(Self::Dash),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
}

/// Held actions plus this tick's press/release edges.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    held: HashSet<Action>,
    pub events: Vec<InputEvent>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop this tick's edges once they have been consumed. Input fed after this
    /// call belongs to the next tick.
    pub fn begin_tick(&mut self) {
        self.events.clear();
    }

    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.events.push(InputEvent::Pressed(action));
        }
    }

    pub fn release(&mut self, action: Action) {
        if self.held.remove(&action) {
            self.events.push(InputEvent::Released(action));
        }
    }

    /// Apply a named action, e.g. from a script or a remapped device.
    pub fn set_named(&mut self, name: &str, down: bool) -> Result<(), UnknownAction> {
        let action = name.parse()?;
        if down {
            self.press(action);
        } else {
            self.release(action);
        }
        Ok(())
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.events.contains(&InputEvent::Pressed(action))
    }

    pub fn just_released(&self, action: Action) -> bool {
        self.events.contains(&InputEvent::Released(action))
    }

    /// Horizontal intent: -1, 0 or 1. Opposite directions cancel.
    pub fn horizontal(&self) -> f32 {
        let mut x = 0.0;
        if self.is_held(Action::MoveLeft) {
            x -= 1.0;
        }
        if self.is_held(Action::MoveRight) {
            x += 1.0;
        }
        x
    }

    /// Forget everything held (used on respawn so stale holds do not carry over).
    pub fn clear(&mut self) {
        self.held.clear();
        self.events.clear();
    }
}
