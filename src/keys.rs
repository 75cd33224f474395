//! Keypad symbols and their semantic roles.
//!
//! The 4x4 matrix produces one symbol per press. Roles are pure functions
//! of the symbol, computed fresh on every poll — there is no cached flag
//! state to get out of sync with the current key.
//!
//! | Symbol | Roles                          |
//! |--------|--------------------------------|
//! | 0-9    | PIN digit                      |
//! | `#`    | accept / confirm               |
//! | `*`    | backspace                      |
//! | `A`    | dialog option A                |
//! | `B`    | dialog option B                |
//! | `C`    | open menu                      |
//! | `D`    | enter PIN (state change)       |

/// One decoded keypad symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A numeric key, value 0-9.
    Digit(u8),
    A,
    B,
    C,
    D,
    Hash,
    Star,
}

impl Key {
    /// Decode the raw ASCII symbol a keypad scan produces.
    pub fn from_ascii(raw: u8) -> Option<Self> {
        match raw {
            b'0'..=b'9' => Some(Self::Digit(raw - b'0')),
            b'A' => Some(Self::A),
            b'B' => Some(Self::B),
            b'C' => Some(Self::C),
            b'D' => Some(Self::D),
            b'#' => Some(Self::Hash),
            b'*' => Some(Self::Star),
            _ => None,
        }
    }

    /// The digit value, when this is a numeric key.
    pub fn digit(self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_accept(self) -> bool {
        self == Self::Hash
    }

    pub fn is_backspace(self) -> bool {
        self == Self::Star
    }

    pub fn is_enter_pin(self) -> bool {
        self == Self::D
    }

    pub fn is_menu(self) -> bool {
        self == Self::C
    }

    pub fn is_option_a(self) -> bool {
        self == Self::A
    }

    pub fn is_option_b(self) -> bool {
        self == Self::B
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_decode() {
        assert_eq!(Key::from_ascii(b'7'), Some(Key::Digit(7)));
        assert_eq!(Key::from_ascii(b'#'), Some(Key::Hash));
        assert_eq!(Key::from_ascii(b'D'), Some(Key::D));
        assert_eq!(Key::from_ascii(b'x'), None);
    }

    #[test]
    fn roles_are_disjoint_per_symbol() {
        let accept = Key::Hash;
        assert!(accept.is_accept());
        assert!(!accept.is_backspace());
        assert!(!accept.is_enter_pin());
        assert_eq!(accept.digit(), None);

        let d = Key::Digit(3);
        assert_eq!(d.digit(), Some(3));
        assert!(!d.is_accept() && !d.is_menu());
    }
}
