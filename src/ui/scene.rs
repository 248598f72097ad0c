//! # Scene Flow
//!
//! ```text
//!            confirm (transmit)
//! SetStrength -----------------> SetRepeat
//!      ^  |                         |
//!      |  +-- back: exit            |
//!      +----- confirm / back -------+
//! ```

use std::fmt;

use super::input::KnobInput;
use super::knob::Knob;

/// Active screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    SetStrength,
    SetRepeat,
}

impl Scene {
    /// Scene after `input`; `None` leaves the UI
    pub fn handle(self, input: KnobInput) -> Option<Scene> {
        match (self, input) {
            (scene, KnobInput::Up | KnobInput::Down) => Some(scene),
            (Scene::SetStrength, KnobInput::Confirm) => Some(Scene::SetRepeat),
            (Scene::SetRepeat, KnobInput::Confirm | KnobInput::Back) => Some(Scene::SetStrength),
            (Scene::SetStrength, KnobInput::Back) => None,
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scene::SetStrength => f.write_str("Strength"),
            Scene::SetRepeat => f.write_str("Repeat"),
        }
    }
}

/// What the caller should do after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// State changed; redraw
    Redraw,
    /// Transmit this strength, then redraw
    Transmit(u8),
    /// Leave the UI
    Exit,
}

/// Current scene plus the knob value each scene edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneManager {
    scene: Scene,
    strength: Knob,
    repeat: Knob,
}

impl SceneManager {
    pub fn new(initial_strength: u8, initial_repeat: u8) -> Self {
        Self {
            scene: Scene::SetStrength,
            strength: Knob::new(initial_strength),
            repeat: Knob::new(initial_repeat),
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    /// Stored strength
    pub fn strength(&self) -> u8 {
        self.strength.value()
    }

    /// Stored repeat value; kept for display only
    pub fn repeat(&self) -> u8 {
        self.repeat.value()
    }

    fn active_knob(&mut self) -> &mut Knob {
        match self.scene {
            Scene::SetStrength => &mut self.strength,
            Scene::SetRepeat => &mut self.repeat,
        }
    }

    /// Apply one input
    pub fn handle(&mut self, input: KnobInput) -> Action {
        match input {
            KnobInput::Up => self.active_knob().increment(),
            KnobInput::Down => self.active_knob().decrement(),
            KnobInput::Confirm | KnobInput::Back => {}
        }

        let previous = self.scene;
        let Some(next) = previous.handle(input) else {
            return Action::Exit;
        };
        self.scene = next;

        if previous == Scene::SetStrength && input == KnobInput::Confirm {
            Action::Transmit(self.strength.value())
        } else {
            Action::Redraw
        }
    }

    /// One-line rendering of the active screen
    pub fn render(&self) -> String {
        match self.scene {
            Scene::SetStrength => format!("[{}] {}", self.scene, self.strength),
            Scene::SetRepeat => format!("[{}] {}", self.scene, self.repeat),
        }
    }
}
