//! Raw key codes and their decoded menu commands.

#![allow(missing_docs)]

/// Set on the raw value when the key is released.
pub const UPSTROKE: u32 = 0x8000_0000;

/// Linux input-event key codes the menu understands.
pub mod code {
    pub const ESC: u32 = 1;
    pub const MINUS: u32 = 12;
    pub const BACKSPACE: u32 = 14;
    pub const ENTER: u32 = 28;
    pub const DOT: u32 = 52;
    pub const SPACE: u32 = 57;
    pub const F12: u32 = 88;
    pub const UP: u32 = 103;
    pub const LEFT: u32 = 105;
    pub const RIGHT: u32 = 106;
    pub const DOWN: u32 = 108;
}

/// A discrete decoded input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
    Select,
    Cancel,
    Menu,
    Backspace,
    TypedChar(char),
    LongPressMenu,
    LongPressUser,
}

impl Command {
    /// Whether this command navigates within a list.
    #[must_use]
    pub const fn is_navigation(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

// Keyboard rows in key-code order.
const ROW_DIGITS: &[u8] = b"1234567890";
const ROW_Q: &[u8] = b"qwertyuiop";
const ROW_A: &[u8] = b"asdfghjkl";
const ROW_Z: &[u8] = b"zxcvbnm";

/// ASCII character produced by a key code, if any.
///
/// Upstroke values never map to a character.
#[must_use]
pub fn ascii_of(raw: u32) -> Option<char> {
    if raw & UPSTROKE != 0 {
        return None;
    }
    let code = raw & 0xFFFF;
    let pick = |row: &[u8], first: u32| {
        code.checked_sub(first)
            .and_then(|i| row.get(i as usize))
            .map(|b| char::from(*b))
    };
    match code {
        2..=11 => pick(ROW_DIGITS, 2),
        16..=25 => pick(ROW_Q, 16),
        30..=38 => pick(ROW_A, 30),
        44..=50 => pick(ROW_Z, 44),
        code::MINUS => Some('-'),
        code::DOT => Some('.'),
        code::SPACE => Some(' '),
        _ => None,
    }
}

/// Decode a debounced raw key value into a command.
///
/// Releases, zero and unknown codes decode to `None`; they are never errors.
#[must_use]
pub fn decode(raw: u32) -> Option<Command> {
    if raw == 0 || raw & UPSTROKE != 0 {
        return None;
    }
    match raw & 0xFFFF {
        code::UP => Some(Command::Up),
        code::DOWN => Some(Command::Down),
        code::LEFT => Some(Command::Left),
        code::RIGHT => Some(Command::Right),
        code::ENTER | code::SPACE => Some(Command::Select),
        code::ESC => Some(Command::Cancel),
        code::F12 => Some(Command::Menu),
        code::BACKSPACE => Some(Command::Backspace),
        _ => ascii_of(raw).map(Command::TypedChar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_control_keys_decode() {
        assert_eq!(decode(code::UP), Some(Command::Up));
        assert_eq!(decode(code::DOWN), Some(Command::Down));
        assert_eq!(decode(code::ENTER), Some(Command::Select));
        assert_eq!(decode(code::SPACE), Some(Command::Select));
        assert_eq!(decode(code::ESC), Some(Command::Cancel));
        assert_eq!(decode(code::F12), Some(Command::Menu));
        assert_eq!(decode(code::BACKSPACE), Some(Command::Backspace));
    }

    #[test]
    fn letters_and_digits_are_typed() {
        assert_eq!(decode(30), Some(Command::TypedChar('a')));
        assert_eq!(decode(50), Some(Command::TypedChar('m')));
        assert_eq!(decode(2), Some(Command::TypedChar('1')));
        assert_eq!(decode(11), Some(Command::TypedChar('0')));
        assert_eq!(decode(25), Some(Command::TypedChar('p')));
    }

    #[test]
    fn upstroke_zero_and_unknown_yield_none() {
        assert_eq!(decode(0), None);
        assert_eq!(decode(code::UP | UPSTROKE), None);
        assert_eq!(decode(0x1FF), None);
        assert_eq!(ascii_of(30 | UPSTROKE), None);
    }

    #[test]
    fn arrows_are_not_printable() {
        assert_eq!(ascii_of(code::UP), None);
        assert_eq!(ascii_of(code::SPACE), Some(' '));
    }
}
