//! Tokens of a generic structured header.

use crate::parser::flags::{Flags, State};

/// Number of string fields packed into one [`Token`].
pub const TOKEN_FIELDS: usize = 2;

/// One phrase, atom or comment from a structured header body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: Box<str>,
    ends: [usize; TOKEN_FIELDS],
    flags: Flags,
}

impl Token {
    pub(crate) fn from_parts(text: Box<str>, ends: [usize; TOKEN_FIELDS], flags: Flags) -> Self {
        Self { text, ends, flags }
    }

    /// Token text: dequoted, folding whitespace collapsed, re-quoted only
    /// when quoted content would otherwise not survive as an atom.
    pub fn text(&self) -> &str {
        self.text.get(..self.ends[0]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ends[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Comments folded into this token's side-channel.
    pub fn comment(&self) -> &str {
        self.text.get(self.ends[0]..self.ends[1]).unwrap_or_default()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Whether the token is a comment emitted in comment-token mode.
    pub fn is_comment(&self) -> bool {
        self.flags.state.contains(State::COMMENT) && self.comment().is_empty()
    }
}
