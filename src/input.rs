//! Keyboard and mouse state.
//!
//! [`Input`] turns raw window events into two kinds of state:
//!
//! - **held**: keys and buttons currently down, used for camera movement
//! - **pressed**: keys that went down since the last frame, used for one-shot
//!   actions; auto-repeat while held does not fire again
//!
//! Mouse motion is accumulated only while a mouse button is held, so the
//! camera turns on drag and ignores hover.

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    F,
    G,
    R,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Space,
    Shift,
    /// `=`/`+` on the main row or keypad plus.
    Plus,
    /// `-` on the main row or keypad minus.
    Minus,
    Escape,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::KeyW => KeyCode::W,
            WinitKeyCode::KeyA => KeyCode::A,
            WinitKeyCode::KeyS => KeyCode::S,
            WinitKeyCode::KeyD => KeyCode::D,
            WinitKeyCode::KeyF => KeyCode::F,
            WinitKeyCode::KeyG => KeyCode::G,
            WinitKeyCode::KeyR => KeyCode::R,

            WinitKeyCode::Digit1 | WinitKeyCode::Numpad1 => KeyCode::Key1,
            WinitKeyCode::Digit2 | WinitKeyCode::Numpad2 => KeyCode::Key2,
            WinitKeyCode::Digit3 | WinitKeyCode::Numpad3 => KeyCode::Key3,
            WinitKeyCode::Digit4 | WinitKeyCode::Numpad4 => KeyCode::Key4,
            WinitKeyCode::Digit5 | WinitKeyCode::Numpad5 => KeyCode::Key5,
            WinitKeyCode::Digit6 | WinitKeyCode::Numpad6 => KeyCode::Key6,

            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::ShiftLeft | WinitKeyCode::ShiftRight => KeyCode::Shift,
            WinitKeyCode::Equal | WinitKeyCode::NumpadAdd => KeyCode::Plus,
            WinitKeyCode::Minus | WinitKeyCode::NumpadSubtract => KeyCode::Minus,
            WinitKeyCode::Escape => KeyCode::Escape,

            _ => KeyCode::Other(key as u32),
        }
    }
}

/// Input state tracking for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,

    cursor: Option<Vec2>,
    drag_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a key went down since the last [`end_frame`](Self::end_frame).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Take a pending press. Returns `true` at most once per physical press.
    pub fn consume_press(&mut self, key: KeyCode) -> bool {
        self.keys_pressed.remove(&key)
    }

    /// Keys pressed this frame, in no particular order.
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys_pressed.iter().copied()
    }

    /// Check if a mouse button is currently held down.
    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    fn any_button_held(&self) -> bool {
        !self.mouse_held.is_empty()
    }

    /// Accumulated drag since the last call, in pixels with y pointing up.
    pub fn take_look_delta(&mut self) -> Vec2 {
        let delta = self.drag_delta;
        self.drag_delta = Vec2::ZERO;
        Vec2::new(delta.x, -delta.y)
    }

    /// Clear per-frame edge state. Held state persists.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Record a key going down.
    pub fn press(&mut self, key: KeyCode) {
        // Only fire pressed event if not already held (no repeat)
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    /// Record a key going up.
    pub fn release(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    pub(crate) fn button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    pub(crate) fn cursor_moved(&mut self, position: Vec2) {
        if let Some(last) = self.cursor {
            if self.any_button_held() {
                self.drag_delta += position - last;
            }
        }
        self.cursor = Some(position);
    }

    /// Drop all held state, e.g. when the window loses focus.
    pub(crate) fn clear_held(&mut self) {
        self.keys_held.clear();
        self.mouse_held.clear();
    }

    /// Process a winit window event.
    pub(crate) fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.button(MouseButton::from(*button), *state);
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }

            WindowEvent::Focused(false) => self.clear_held(),

            _ => {}
        }
    }
}
