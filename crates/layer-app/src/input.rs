// ---------------------------------------------------------------------------
// Key: windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else
/// in the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Number row, 0–9.
    Digit(u8),
    Left,
    Right,
    Home,
    End,
    Space,
    Q,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction: what the app does in response to input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    SelectLayer(u32),
    NextLayer,
    PrevLayer,
    FirstLayer,
    LastLayer,
    ToggleCycle,
    Quit,
}

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

pub struct InputState;

impl InputState {
    pub fn new() -> Self {
        Self
    }

    /// Translate a `Key` press into an `InputAction`, if the key is mapped.
    /// Digits 1–9 select layers 0–8; 0 is unmapped.
    pub fn on_key(&self, key: Key) -> Option<InputAction> {
        match key {
            Key::Digit(d @ 1..=9) => Some(InputAction::SelectLayer(u32::from(d) - 1)),
            Key::Digit(_) => None,
            Key::Right => Some(InputAction::NextLayer),
            Key::Left => Some(InputAction::PrevLayer),
            Key::Home => Some(InputAction::FirstLayer),
            Key::End => Some(InputAction::LastLayer),
            Key::Space => Some(InputAction::ToggleCycle),
            Key::Q | Key::Escape => Some(InputAction::Quit),
        }
    }
}
