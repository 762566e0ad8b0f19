//! Control input state and its five-byte wire encoding

/// Highest press count one control byte can carry (seven bits above the pressed flag).
pub const MAX_WIRE_DOWNS: u8 = 0x7F;

/// State of a single key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Button {
    /// Held down right now
    pub pressed: bool,
    /// Presses since the counter was last reset
    pub downs: u8,
}

impl Button {
    pub fn press(&mut self) {
        self.pressed = true;
        self.downs = self.downs.saturating_add(1);
    }

    pub fn release(&mut self) {
        self.pressed = false;
    }

    /// Bit 0 carries `pressed`, bits 1..8 the press count.
    pub fn to_byte(self) -> u8 {
        (self.downs.min(MAX_WIRE_DOWNS) << 1) | u8::from(self.pressed)
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            pressed: byte & 1 != 0,
            downs: byte >> 1,
        }
    }

    /// Folds a newer report into this one: `pressed` is replaced, presses add up.
    pub fn merge(&mut self, newer: Button) {
        self.pressed = newer.pressed;
        self.downs = self.downs.saturating_add(newer.downs);
    }
}

/// The five controls a player reports every frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: Button,
    pub right: Button,
    pub up: Button,
    pub down: Button,
    pub jump: Button,
}

impl Controls {
    pub const WIRE_LEN: usize = 5;

    fn buttons(&self) -> [&Button; 5] {
        [&self.left, &self.right, &self.up, &self.down, &self.jump]
    }

    fn buttons_mut(&mut self) -> [&mut Button; 5] {
        [
            &mut self.left,
            &mut self.right,
            &mut self.up,
            &mut self.down,
            &mut self.jump,
        ]
    }

    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        self.buttons().map(|button| button.to_byte())
    }

    pub fn from_bytes(bytes: [u8; Self::WIRE_LEN]) -> Self {
        let [left, right, up, down, jump] = bytes.map(Button::from_byte);
        Self {
            left,
            right,
            up,
            down,
            jump,
        }
    }

    pub fn merge(&mut self, newer: &Controls) {
        for (button, newer) in self.buttons_mut().into_iter().zip(newer.buttons()) {
            button.merge(*newer);
        }
    }

    pub fn reset_downs(&mut self) {
        for button in self.buttons_mut() {
            button.downs = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_byte_layout() {
        let button = Button {
            pressed: true,
            downs: 3,
        };
        assert_eq!(button.to_byte(), 0b0000_0111);
        assert_eq!(Button::from_byte(0b0000_0111), button);

        let released = Button {
            pressed: false,
            downs: 2,
        };
        assert_eq!(released.to_byte(), 0b0000_0100);
    }

    #[test]
    fn test_button_downs_capped_on_wire() {
        let button = Button {
            pressed: false,
            downs: 200,
        };
        let decoded = Button::from_byte(button.to_byte());
        assert_eq!(decoded.downs, MAX_WIRE_DOWNS);
        assert!(!decoded.pressed);
    }

    #[test]
    fn test_button_press_saturates() {
        let mut button = Button::default();
        for _ in 0..300 {
            button.press();
        }
        assert_eq!(button.downs, u8::MAX);
        assert!(button.pressed);

        button.release();
        assert!(!button.pressed);
        assert_eq!(button.downs, u8::MAX);
    }

    #[test]
    fn test_controls_field_order() {
        let mut controls = Controls::default();
        controls.left.press();
        controls.jump.press();
        controls.jump.press();

        assert_eq!(controls.to_bytes(), [0b11, 0, 0, 0, 0b101]);
        assert_eq!(Controls::from_bytes(controls.to_bytes()), controls);
    }

    #[test]
    fn test_controls_merge_accumulates_downs() {
        let mut held = Controls::default();
        held.up.press();

        let mut newer = Controls::default();
        newer.up.downs = 2;
        newer.right.press();

        held.merge(&newer);

        assert!(!held.up.pressed);
        assert_eq!(held.up.downs, 3);
        assert!(held.right.pressed);
        assert_eq!(held.right.downs, 1);

        held.reset_downs();
        assert_eq!(held.up.downs, 0);
        assert!(held.right.pressed);
    }
}
