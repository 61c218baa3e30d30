//! Raw key events as delivered by the host framework.
//!
//! The host hands us a keysym value, a hardware keycode and an opaque modifier
//! bitmask. Only a handful of modifier bits are ever inspected (release,
//! control, alt, super); everything else is carried through untouched.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Modifier state attached to a key event.
    ///
    /// Bit positions follow the IBus modifier masks. Unknown bits are retained
    /// so the mask can be passed back to the host unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        /// Usually Alt.
        const MOD1 = 1 << 3;
        const MOD4 = 1 << 6;
        const SUPER = 1 << 26;
        const RELEASE = 1 << 30;

        const _ = !0;
    }
}

impl Modifiers {
    /// Modifiers that make the IME leave a keystroke to the host.
    pub const PASS_THROUGH: Modifiers = Modifiers::CONTROL
        .union(Modifiers::MOD1)
        .union(Modifiers::MOD4)
        .union(Modifiers::SUPER);
}

/// Keysym values the router knows about.
pub mod keysym {
    pub const SPACE: u32 = 0x0020;
    pub const APOSTROPHE: u32 = 0x0027;
    pub const MINUS: u32 = 0x002d;
    pub const EQUAL: u32 = 0x003d;
    pub const DIGIT_0: u32 = 0x0030;
    pub const DIGIT_1: u32 = 0x0031;
    pub const DIGIT_9: u32 = 0x0039;
    pub const LOWER_A: u32 = 0x0061;
    pub const LOWER_Z: u32 = 0x007a;

    pub const BACKSPACE: u32 = 0xff08;
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const PAGE_UP: u32 = 0xff55;
    pub const PAGE_DOWN: u32 = 0xff56;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const SHIFT_R: u32 = 0xffe2;
    pub const DELETE: u32 = 0xffff;
}

/// Outcome reported back to the host for a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// The IME consumed the key.
    Handled,
    /// The host (or the focused application) should process the key.
    PassThrough,
}

impl KeyResult {
    pub fn is_handled(self) -> bool {
        matches!(self, KeyResult::Handled)
    }
}

/// A single key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keyval: u32,
    pub keycode: u32,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(keyval: u32, keycode: u32, modifiers: Modifiers) -> Self {
        Self {
            keyval,
            keycode,
            modifiers,
        }
    }

    /// Build an event from the raw host triple.
    pub fn from_raw(keyval: u32, keycode: u32, modifier_bits: u32) -> Self {
        Self::new(keyval, keycode, Modifiers::from_bits_retain(modifier_bits))
    }

    /// Key press with no modifiers.
    pub fn press(keyval: u32) -> Self {
        Self::new(keyval, 0, Modifiers::empty())
    }

    /// Key release with no other modifiers.
    pub fn release(keyval: u32) -> Self {
        Self::new(keyval, 0, Modifiers::RELEASE)
    }

    pub fn is_release(&self) -> bool {
        self.modifiers.contains(Modifiers::RELEASE)
    }

    /// Whether this is the designated mode-switch key.
    pub fn is_mode_toggle(&self) -> bool {
        matches!(self.keyval, keysym::SHIFT_L | keysym::SHIFT_R)
    }

    pub fn has_pass_through_modifier(&self) -> bool {
        self.modifiers.intersects(Modifiers::PASS_THROUGH)
    }

    /// The printable ASCII character for this keysym, if any.
    pub fn ascii(&self) -> Option<char> {
        if (0x20..0x7f).contains(&self.keyval) {
            char::from_u32(self.keyval)
        } else {
            None
        }
    }
}

/// Error returned when a key name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown key name: {:?}", self.0)
    }
}

impl std::error::Error for UnknownKey {}

/// Resolve an X11-style key name (`"BackSpace"`, `"a"`, `"comma"`) to a keysym.
///
/// Single printable ASCII characters map to themselves.
pub fn keysym_from_name(name: &str) -> Result<u32, UnknownKey> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_graphic() {
            return Ok(ch as u32);
        }
    }

    let value = match name {
        "space" => keysym::SPACE,
        "apostrophe" => keysym::APOSTROPHE,
        "minus" => keysym::MINUS,
        "equal" => keysym::EQUAL,
        "comma" => ',' as u32,
        "period" => '.' as u32,
        "BackSpace" => keysym::BACKSPACE,
        "Return" => keysym::RETURN,
        "Escape" => keysym::ESCAPE,
        "Left" => keysym::LEFT,
        "Up" => keysym::UP,
        "Right" => keysym::RIGHT,
        "Down" => keysym::DOWN,
        "Page_Up" => keysym::PAGE_UP,
        "Page_Down" => keysym::PAGE_DOWN,
        "KP_Enter" => keysym::KP_ENTER,
        "Shift_L" => keysym::SHIFT_L,
        "Shift_R" => keysym::SHIFT_R,
        "Delete" => keysym::DELETE,
        _ => return Err(UnknownKey(name.to_string())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_modifier_bits_are_retained() {
        let event = KeyEvent::from_raw('a' as u32, 38, (1 << 30) | (1 << 13));
        assert!(event.is_release());
        assert_eq!(event.modifiers.bits(), (1 << 30) | (1 << 13));
    }

    #[test]
    fn test_pass_through_modifiers() {
        for m in [
            Modifiers::CONTROL,
            Modifiers::MOD1,
            Modifiers::MOD4,
            Modifiers::SUPER,
        ] {
            let event = KeyEvent::new('a' as u32, 0, m);
            assert!(event.has_pass_through_modifier(), "{:?}", m);
        }
        let shifted = KeyEvent::new('A' as u32, 0, Modifiers::SHIFT);
        assert!(!shifted.has_pass_through_modifier());
    }

    #[test]
    fn test_mode_toggle_keys() {
        assert!(KeyEvent::press(keysym::SHIFT_L).is_mode_toggle());
        assert!(KeyEvent::release(keysym::SHIFT_R).is_mode_toggle());
        assert!(!KeyEvent::press('a' as u32).is_mode_toggle());
    }

    #[test]
    fn test_keysym_names() {
        assert_eq!(keysym_from_name("a"), Ok('a' as u32));
        assert_eq!(keysym_from_name(","), Ok(',' as u32));
        assert_eq!(keysym_from_name("comma"), Ok(',' as u32));
        assert_eq!(keysym_from_name("BackSpace"), Ok(keysym::BACKSPACE));
        assert_eq!(keysym_from_name("Shift_L"), Ok(keysym::SHIFT_L));
        assert!(keysym_from_name("Hyper_Q").is_err());
    }

    #[test]
    fn test_ascii() {
        assert_eq!(KeyEvent::press('n' as u32).ascii(), Some('n'));
        assert_eq!(KeyEvent::press(keysym::SPACE).ascii(), Some(' '));
        assert_eq!(KeyEvent::press(keysym::ESCAPE).ascii(), None);
    }
}
