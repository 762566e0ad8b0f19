//! Keyboard sampling into the controls report

use macroquad::prelude::*;
use shared::{Button, Controls};

/// Samples WASD (or the arrow keys) and Space into [`Controls`]
pub struct InputManager {
    bindings: [(Control, &'static [KeyCode]); 5],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Left,
    Right,
    Up,
    Down,
    Jump,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            bindings: [
                (Control::Left, &[KeyCode::A, KeyCode::Left]),
                (Control::Right, &[KeyCode::D, KeyCode::Right]),
                (Control::Up, &[KeyCode::W, KeyCode::Up]),
                (Control::Down, &[KeyCode::S, KeyCode::Down]),
                (Control::Jump, &[KeyCode::Space]),
            ],
        }
    }

    /// Folds this frame's key state into `controls`.
    pub fn update(&self, controls: &mut Controls) {
        for (control, keys) in &self.bindings {
            let down = keys.iter().any(|key| is_key_down(*key));
            let went_down = keys.iter().any(|key| is_key_pressed(*key));
            sample(button_mut(controls, *control), down, went_down);
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

fn button_mut(controls: &mut Controls, control: Control) -> &mut Button {
    match control {
        Control::Left => &mut controls.left,
        Control::Right => &mut controls.right,
        Control::Up => &mut controls.up,
        Control::Down => &mut controls.down,
        Control::Jump => &mut controls.jump,
    }
}

fn sample(button: &mut Button, down: bool, went_down: bool) {
    if went_down {
        button.press();
    }
    button.pressed = down;
}
