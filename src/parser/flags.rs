//! Mode, state and error bit vocabularies.
//!
//! The three sets occupy disjoint ranges of one `u32` so they can be OR-ed
//! into the single word reported by [`Flags::bits`] and by
//! [`ImfError::code`](crate::error::ImfError::code):
//!
//! | bits    | set      |
//! |---------|----------|
//! | 0..=7   | [`Mode`] |
//! | 8..=17  | [`State`] |
//! | 24..=30 | [`Faults`] |

use std::fmt;

bitflags::bitflags! {
    /// Caller-selected options, fixed for one parse call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Mode: u32 {
        /// Accept an unquoted `.` inside a display-name (`John Q. Public <a@b>`).
        const DISPLAY_NAME_DOT = 1 << 0;
        /// Accept an addr-spec without `@domain` (`<root>`).
        const ADDR_SPEC_NO_DOMAIN = 1 << 1;
        /// Structured headers: a `.` is part of atom text.
        const DOT_ATOM = 1 << 2;
        /// Structured headers: emit comments as tokens of their own.
        const COMMENT_TOKENS = 1 << 3;
        /// Structured headers: an unquoted `;` terminates a token.
        const SEMICOLON = 1 << 4;
        /// Structured headers: zero-length tokens are allowed.
        const EMPTY_TOKENS = 1 << 5;
        /// Downgrade syntax errors to recorded bits and continue.
        const RELAX = 1 << 6;
        /// Return after the first successfully built entity.
        const STOP_EARLY = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Observations recorded while parsing one entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct State: u32 {
        /// A display-name contained an unquoted dot and [`Mode::DISPLAY_NAME_DOT`] allowed it.
        const DISPLAY_NAME_DOT = 1 << 8;
        /// An addr-spec without domain was accepted.
        const ADDR_SPEC_NO_DOMAIN = 1 << 9;
        /// The domain is a bracketed literal.
        const DOMAIN_LITERAL = 1 << 10;
        /// The address is a member of a group.
        const GROUP = 1 << 11;
        /// The address opens a group and carries its display-name.
        const GROUP_START = 1 << 12;
        /// The address closes a group.
        const GROUP_END = 1 << 13;
        /// The record stands for a group without members.
        const GROUP_EMPTY = 1 << 14;
        /// Structured headers: the token was terminated by a semicolon.
        const SEMICOLON = 1 << 15;
        /// Structured headers: a comment was seen (or the token is one).
        const COMMENT = 1 << 16;
        /// At least one error was downgraded by [`Mode::RELAX`].
        const RELAXED = 1 << 17;
    }
}

bitflags::bitflags! {
    /// Syntax errors. Fatal unless [`Mode::RELAX`] is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Faults: u32 {
        /// A group has an empty display-name.
        const GROUP_DISPLAY_NAME_EMPTY = 1 << 24;
        /// A display-name contained an unquoted dot.
        const DISPLAY_NAME_DOT = 1 << 25;
        /// Malformed or unterminated quoted string.
        const QUOTE = 1 << 26;
        /// A group was never closed with `;`.
        const GROUP_OPEN = 1 << 27;
        /// Malformed or unterminated comment.
        const COMMENT = 1 << 28;
        /// Invalid or unexpectedly empty content (bad route, stray byte, ...).
        const CONTENT = 1 << 29;
        /// Summary: the faults above were relaxed rather than fatal.
        const RELAX = 1 << 30;
    }
}

/// The state and error word of one record, or of a whole parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    pub state: State,
    pub faults: Faults,
}

impl Flags {
    /// Both sets combined into one word.
    pub fn bits(self) -> u32 {
        self.state.bits() | self.faults.bits()
    }

    pub fn is_clean(self) -> bool {
        self.faults.is_empty()
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            state: self.state | other.state,
            faults: self.faults | other.faults,
        }
    }

    /// Names of every bit set, state first.
    pub fn names(self) -> Vec<&'static str> {
        let state = self.state.iter_names().map(|(name, _)| name);
        let faults = self.faults.iter_names().map(|(name, _)| name);
        state.chain(faults).collect()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            return f.write_str("-");
        }
        write!(f, "{}", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_disjoint() {
        let mode = Mode::all().bits();
        let state = State::all().bits();
        let faults = Faults::all().bits();
        assert_eq!(mode & state, 0);
        assert_eq!(mode & faults, 0);
        assert_eq!(state & faults, 0);
        // The combined word must stay positive as an i32 result code.
        assert!(i32::try_from(state | faults).is_ok());
    }

    #[test]
    fn test_display_lists_names() {
        let flags = Flags {
            state: State::GROUP | State::GROUP_START,
            faults: Faults::CONTENT,
        };
        assert_eq!(flags.to_string(), "GROUP|GROUP_START|CONTENT");
        assert_eq!(Flags::default().to_string(), "-");
    }

    #[test]
    fn test_bits_combines_both_sets() {
        let flags = Flags {
            state: State::DOMAIN_LITERAL,
            faults: Faults::QUOTE,
        };
        assert_eq!(flags.bits(), (1 << 10) | (1 << 26));
        assert!(!flags.is_clean());
    }
}
