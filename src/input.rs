//! Platform-neutral input types for shortcut dispatch.
//!
//! The engine recognizes undo/redo chords without depending on any
//! windowing crate; host platform layers map their native key events into
//! [`KeyEvent`] before calling
//! [`HistoryRoot::handle_shortcut`](crate::HistoryRoot::handle_shortcut).

/// Physical keyboard key identifier (US QWERTY position names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

/// Modifier key state accompanying a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
    /// Cmd on macOS, Win key elsewhere.
    pub super_key: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        control: false,
        shift: false,
        alt: false,
        super_key: false,
    };

    pub const CONTROL: Self = Self {
        control: true,
        ..Self::NONE
    };

    pub const CONTROL_SHIFT: Self = Self {
        control: true,
        shift: true,
        ..Self::NONE
    };

    /// Whether the platform primary chord modifier is held.
    ///
    /// Platform-neutral: both Ctrl and the super key count, so hosts do not
    /// need per-OS mapping before dispatch.
    pub fn primary(&self) -> bool {
        self.control || self.super_key
    }
}

/// One keyboard event as delivered by the host input system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
    /// `true` for press, `false` for release.
    pub pressed: bool,
}

impl KeyEvent {
    pub fn pressed(key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            pressed: true,
        }
    }

    pub fn released(key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            pressed: false,
        }
    }

    /// Primary+Z without Shift.
    pub fn is_undo_chord(&self) -> bool {
        self.pressed
            && self.key == KeyCode::Z
            && self.modifiers.primary()
            && !self.modifiers.shift
            && !self.modifiers.alt
    }

    /// Primary+Y, or Primary+Shift+Z.
    pub fn is_redo_chord(&self) -> bool {
        if !self.pressed || self.modifiers.alt || !self.modifiers.primary() {
            return false;
        }
        match self.key {
            KeyCode::Y => !self.modifiers.shift,
            KeyCode::Z => self.modifiers.shift,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_chord_variants() {
        assert!(KeyEvent::pressed(KeyCode::Z, Modifiers::CONTROL).is_undo_chord());
        assert!(KeyEvent::pressed(
            KeyCode::Z,
            Modifiers {
                super_key: true,
                ..Modifiers::NONE
            }
        )
        .is_undo_chord());

        // Shifted Z is redo, not undo.
        assert!(!KeyEvent::pressed(KeyCode::Z, Modifiers::CONTROL_SHIFT).is_undo_chord());
        // No modifier, no chord.
        assert!(!KeyEvent::pressed(KeyCode::Z, Modifiers::NONE).is_undo_chord());
        // Release events never match.
        assert!(!KeyEvent::released(KeyCode::Z, Modifiers::CONTROL).is_undo_chord());
    }

    #[test]
    fn redo_chord_variants() {
        assert!(KeyEvent::pressed(KeyCode::Y, Modifiers::CONTROL).is_redo_chord());
        assert!(KeyEvent::pressed(KeyCode::Z, Modifiers::CONTROL_SHIFT).is_redo_chord());

        assert!(!KeyEvent::pressed(KeyCode::Y, Modifiers::CONTROL_SHIFT).is_redo_chord());
        assert!(!KeyEvent::pressed(KeyCode::Y, Modifiers::NONE).is_redo_chord());
        assert!(!KeyEvent::pressed(KeyCode::Z, Modifiers::CONTROL).is_redo_chord());
    }

    #[test]
    fn alt_disables_chords() {
        let with_alt = Modifiers {
            control: true,
            alt: true,
            ..Modifiers::NONE
        };
        assert!(!KeyEvent::pressed(KeyCode::Z, with_alt).is_undo_chord());
        assert!(!KeyEvent::pressed(KeyCode::Y, with_alt).is_redo_chord());
    }
}
