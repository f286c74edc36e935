//! Parsed mailbox records (RFC 5322 §3.4).

use std::fmt;

use crate::parser::flags::{Flags, State};

const GROUP: usize = 0;
const DISPLAY: usize = 1;
const LOCPAR: usize = 2;
const DOMAIN: usize = 3;
const COMMENT: usize = 4;

/// Number of string fields packed into one [`Address`].
pub const ADDRESS_FIELDS: usize = 5;

/// One mailbox (or empty-group marker) from an address header.
///
/// All string fields share one buffer. Absent fields are empty strings.
///
/// # Examples
/// - `"Juan Garcia" <juan@ejemplo.com>` → `display_name = "Juan Garcia"`,
///   `locpar = "juan"`, `domain = "ejemplo.com"`
/// - `"Last, First" <a@b>` → `display_name = "\"Last, First\""`; names that
///   need quotes keep exactly one pair
/// - `Team: a@b;` → `group_display_name = "Team"` on the member `a@b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    text: Box<str>,
    ends: [usize; ADDRESS_FIELDS],
    flags: Flags,
}

impl Address {
    pub(crate) fn from_parts(text: Box<str>, ends: [usize; ADDRESS_FIELDS], flags: Flags) -> Self {
        Self { text, ends, flags }
    }

    fn field(&self, i: usize) -> &str {
        let start = if i == 0 { 0 } else { self.ends[i - 1] };
        self.text.get(start..self.ends[i]).unwrap_or_default()
    }

    /// Display-name of the group this record opens; empty on other members.
    pub fn group_display_name(&self) -> &str {
        self.field(GROUP)
    }

    pub fn display_name(&self) -> &str {
        self.field(DISPLAY)
    }

    /// Local-part, quoted only if its content requires it.
    pub fn locpar(&self) -> &str {
        self.field(LOCPAR)
    }

    /// Domain name, or a bracketed literal when [`State::DOMAIN_LITERAL`] is set.
    pub fn domain(&self) -> &str {
        self.field(DOMAIN)
    }

    /// Every comment seen while parsing this entity, space-joined.
    pub fn comment(&self) -> &str {
        self.field(COMMENT)
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_empty_group(&self) -> bool {
        self.flags.state.contains(State::GROUP_EMPTY)
    }

    /// `locpar@domain`, or the bare local-part when there is no domain.
    pub fn addr_spec(&self) -> String {
        if self.domain().is_empty() {
            self.locpar().to_string()
        } else {
            format!("{}@{}", self.locpar(), self.domain())
        }
    }

    /// Total bytes of string content.
    pub fn text_len(&self) -> usize {
        self.text.len()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_group() {
            return write!(f, "{}:;", self.group_display_name());
        }
        if self.display_name().is_empty() {
            write!(f, "{}", self.addr_spec())
        } else {
            write!(f, "{} <{}>", self.display_name(), self.addr_spec())
        }
    }
}
