//! Input Capture and Normalization
//!
//! Tracks which logical controls are held, debounced to press/release
//! edges. Discrete controls (fire, reload, pause) produce an [`InputEvent`]
//! on their press edge only; movement controls are sampled every tick as an
//! [`Intent`].

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

// =============================================================================
// CONTROLS
// =============================================================================

/// Logical control, independent of the physical key bound to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Turn counter-clockwise on screen.
    RotateLeft,
    /// Turn clockwise on screen.
    RotateRight,
    /// Drive forward.
    ThrottleForward,
    /// Drive in reverse.
    ThrottleBack,
    /// Shoot.
    Fire,
    /// Request a reload.
    Reload,
    /// Toggle pause.
    Pause,
}

impl Control {
    /// All controls, in bit order.
    pub const ALL: [Control; 7] = [
        Control::RotateLeft,
        Control::RotateRight,
        Control::ThrottleForward,
        Control::ThrottleBack,
        Control::Fire,
        Control::Reload,
        Control::Pause,
    ];

    /// Controls that feed continuous movement.
    pub const MOVEMENT: [Control; 4] = [
        Control::RotateLeft,
        Control::RotateRight,
        Control::ThrottleForward,
        Control::ThrottleBack,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Is this a movement control.
    #[inline]
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Control::RotateLeft | Control::RotateRight | Control::ThrottleForward | Control::ThrottleBack
        )
    }

    /// Discrete event raised when this control is pressed.
    pub fn press_event(self) -> Option<InputEvent> {
        match self {
            Control::Fire => Some(InputEvent::Fire),
            Control::Reload => Some(InputEvent::Reload),
            Control::Pause => Some(InputEvent::TogglePause),
            _ => None,
        }
    }
}

/// Discrete action triggered by a press edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Fire requested.
    Fire,
    /// Reload requested.
    Reload,
    /// Pause toggled.
    TogglePause,
}

/// Net throttle intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThrottleDirection {
    /// Forward held (wins over back).
    Forward,
    /// Only back held.
    Back,
    /// Neither held.
    #[default]
    None,
}

/// Net rotation intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RotationDirection {
    /// Only left held.
    Left,
    /// Only right held.
    Right,
    /// Both held: both rotations apply and cancel out.
    Both,
    /// Neither held.
    #[default]
    None,
}

impl RotationDirection {
    /// Rotate-left is applied this tick.
    #[inline]
    pub fn turns_left(self) -> bool {
        matches!(self, RotationDirection::Left | RotationDirection::Both)
    }

    /// Rotate-right is applied this tick.
    #[inline]
    pub fn turns_right(self) -> bool {
        matches!(self, RotationDirection::Right | RotationDirection::Both)
    }

    /// Any rotation key is held.
    #[inline]
    pub fn is_rotating(self) -> bool {
        !matches!(self, RotationDirection::None)
    }
}

/// Continuous intent sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    /// Rotation intent.
    pub rotation: RotationDirection,
    /// Throttle intent.
    pub throttle: ThrottleDirection,
}

impl Intent {
    /// No controls held.
    pub const IDLE: Self = Self {
        rotation: RotationDirection::None,
        throttle: ThrottleDirection::None,
    };

    /// Build an intent directly (used by scripted input and tests).
    pub const fn new(rotation: RotationDirection, throttle: ThrottleDirection) -> Self {
        Self { rotation, throttle }
    }
}

// =============================================================================
// INPUT STATE
// =============================================================================

/// Held-state for every [`Control`], packed into one byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    held: u8,
}

impl InputState {
    /// Empty state: nothing held.
    pub const fn new() -> Self {
        Self { held: 0 }
    }

    /// Apply a press/release edge.
    ///
    /// Repeated presses of an already-held control (keyboard auto-repeat)
    /// and releases of a control that is not held change nothing and emit
    /// nothing. A discrete event is emitted only on the press edge.
    pub fn on_key_edge(&mut self, control: Control, pressed: bool) -> Option<InputEvent> {
        if self.is_held(control) == pressed {
            return None;
        }

        if pressed {
            self.held |= control.bit();
            control.press_event()
        } else {
            self.held &= !control.bit();
            None
        }
    }

    /// Is a control currently held.
    #[inline]
    pub fn is_held(&self, control: Control) -> bool {
        self.held & control.bit() != 0
    }

    /// Nothing held at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.held == 0
    }

    /// Any of the four movement controls held.
    pub fn is_any_movement_held(&self) -> bool {
        Control::MOVEMENT.iter().any(|c| self.is_held(*c))
    }

    /// Net throttle direction. Forward wins when both are held.
    pub fn throttle_direction(&self) -> ThrottleDirection {
        if self.is_held(Control::ThrottleForward) {
            ThrottleDirection::Forward
        } else if self.is_held(Control::ThrottleBack) {
            ThrottleDirection::Back
        } else {
            ThrottleDirection::None
        }
    }

    /// Net rotation direction.
    pub fn rotation_direction(&self) -> RotationDirection {
        match (self.is_held(Control::RotateLeft), self.is_held(Control::RotateRight)) {
            (true, true) => RotationDirection::Both,
            (true, false) => RotationDirection::Left,
            (false, true) => RotationDirection::Right,
            (false, false) => RotationDirection::None,
        }
    }

    /// Sample the continuous intent for this tick.
    pub fn intent(&self) -> Intent {
        Intent {
            rotation: self.rotation_direction(),
            throttle: self.throttle_direction(),
        }
    }

    /// Forget every held control.
    #[inline]
    pub fn clear(&mut self) {
        self.held = 0;
    }

    /// Controls currently held, in declaration order.
    pub fn held_controls(&self) -> impl Iterator<Item = Control> + '_ {
        Control::ALL.into_iter().filter(move |c| self.is_held(*c))
    }
}

// =============================================================================
// PHYSICAL KEYS
// =============================================================================

/// Physical key codes currently down, each with the control it resolved to.
///
/// Several keys may share one control. The control stays held in the
/// [`InputState`] until the last of its keys is released.
#[derive(Clone, Debug, Default)]
pub struct HeldKeys {
    keys: HashMap<String, Control>,
}

impl HeldKeys {
    /// No keys down.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a physical key edge and fold it into `input`.
    ///
    /// Auto-repeat of a key already down and release of a key not down are
    /// ignored. Every fresh press of a discrete control emits its event, even
    /// while another key bound to the same control is held.
    pub fn on_key_edge(
        &mut self,
        input: &mut InputState,
        code: &str,
        control: Control,
        pressed: bool,
    ) -> Option<InputEvent> {
        if pressed {
            if self.keys.contains_key(code) {
                return None;
            }
            self.keys.insert(code.to_string(), control);
            if input.is_held(control) {
                return control.press_event();
            }
            input.on_key_edge(control, true)
        } else {
            let control = self.keys.remove(code)?;
            if !self.keys.values().any(|held| *held == control) {
                input.on_key_edge(control, false);
            }
            None
        }
    }

    /// Is this key code down.
    pub fn is_down(&self, code: &str) -> bool {
        self.keys.contains_key(code)
    }

    /// Nothing down.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Forget every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

// =============================================================================
// KEY BINDINGS
// =============================================================================

/// Map from physical key codes (DOM `KeyboardEvent.code` names) to controls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings {
    bindings: HashMap<String, Control>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert("KeyW".to_string(), Control::ThrottleForward);
        bindings.insert("KeyS".to_string(), Control::ThrottleBack);
        bindings.insert("KeyA".to_string(), Control::RotateLeft);
        bindings.insert("KeyD".to_string(), Control::RotateRight);
        bindings.insert("Space".to_string(), Control::Fire);
        bindings.insert("Enter".to_string(), Control::Fire);
        bindings.insert("Escape".to_string(), Control::Pause);
        bindings.insert("KeyP".to_string(), Control::Pause);
        bindings.insert("KeyR".to_string(), Control::Reload);
        Self { bindings }
    }
}

impl KeyBindings {
    /// Bind (or rebind) a key code.
    pub fn bind(&mut self, code: impl Into<String>, control: Control) {
        self.bindings.insert(code.into(), control);
    }

    /// Remove a binding.
    pub fn unbind(&mut self, code: &str) -> Option<Control> {
        self.bindings.remove(code)
    }

    /// Control bound to a key code, if any.
    pub fn resolve(&self, code: &str) -> Option<Control> {
        self.bindings.get(code).copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================
