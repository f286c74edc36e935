//! RFC 5322 header-field body parsing.
//!
//! Two state machines share one set of lookahead primitives:
//!
//! - [`Parser::parse_addr_header`] turns an address header body (`From`,
//!   `To`, `Cc`, ...) into a list of [`Address`] records;
//! - [`Parser::parse_struct_header`] splits any other structured body into
//!   [`Token`]s.
//!
//! Records are allocated from a caller-owned [`Bag`] and live exactly as
//! long as it (or the snapshot they were parsed after).

pub mod address;
pub mod chars;
pub mod flags;
pub mod header;
pub mod lex;
pub mod record;
pub mod structured;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{ImfError, Result};
use crate::model::address::Address;
use crate::model::token::Token;
use crate::store::bag::{Bag, RecordId};

use self::flags::{Flags, Mode};
use self::lex::{Halt, Lexer};
use self::record::ListBuilder;

/// Inputs at or above this many bytes are refused with [`ImfError::Overflow`].
pub const MAX_INPUT_LEN: usize = i32::MAX as usize;

/// The list produced by one parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed {
    /// First record, `None` if nothing was built.
    pub head: Option<RecordId>,
    /// Number of records reachable from `head`.
    pub len: usize,
    /// Union of the state/error bits of every record (and, on failure, of
    /// the entity that failed).
    pub flags: Flags,
    /// Byte offset at which parsing stopped.
    pub stopped_at: usize,
}

impl Parsed {
    /// Iterate the produced records in input order.
    pub fn records<'b, T>(&self, bag: &'b Bag<T>) -> impl Iterator<Item = &'b T> {
        bag.chain(self.head, self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Result code of a successful call.
    pub fn code(&self) -> i32 {
        0
    }
}

/// Header parser configured with a mode and an input ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    mode: Mode,
    max_input: usize,
}

impl Parser {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            max_input: MAX_INPUT_LEN,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.mode()).with_max_input(config.max_input_len)
    }

    /// Lower the input ceiling (it can never exceed [`MAX_INPUT_LEN`]).
    pub fn with_max_input(mut self, max_input: usize) -> Self {
        self.max_input = max_input.min(MAX_INPUT_LEN);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Parse an address header body into `bag`.
    ///
    /// # Errors
    ///
    /// [`ImfError::Empty`] and [`ImfError::Overflow`] are raised before any
    /// allocation. [`ImfError::Syntax`] and [`ImfError::NoMemory`] carry the
    /// records fully built before the failure.
    pub fn parse_addr_header(
        &self,
        input: impl AsRef<[u8]>,
        bag: &mut Bag<Address>,
    ) -> Result<Parsed> {
        let input = self.prepare(input.as_ref())?;
        let mut list = ListBuilder::default();
        let mut lx = Lexer::new(input, self.mode);
        let halt = address::parse(&mut lx, bag, &mut list);
        self.conclude("address", halt, &mut lx, &list)
    }

    /// Tokenize a structured header body into `bag`.
    ///
    /// # Errors
    ///
    /// As for [`Parser::parse_addr_header`].
    pub fn parse_struct_header(
        &self,
        input: impl AsRef<[u8]>,
        bag: &mut Bag<Token>,
    ) -> Result<Parsed> {
        let input = self.prepare(input.as_ref())?;
        let mut list = ListBuilder::default();
        let mut lx = Lexer::new(input, self.mode);
        let halt = structured::parse(&mut lx, bag, &mut list);
        self.conclude("structured", halt, &mut lx, &list)
    }

    /// Cut the input at its first NUL and reject empty or oversized bodies.
    fn prepare<'a>(&self, input: &'a [u8]) -> Result<&'a [u8]> {
        let input = match input.iter().position(|&b| b == 0) {
            Some(nul) => &input[..nul],
            None => input,
        };
        if input.len() >= self.max_input {
            return Err(ImfError::Overflow {
                len: input.len(),
                limit: self.max_input,
            });
        }
        if input.iter().all(|&b| chars::is_fws(b)) {
            return Err(ImfError::Empty);
        }
        Ok(input)
    }

    fn conclude(
        &self,
        kind: &'static str,
        halt: std::result::Result<(), Halt>,
        lx: &mut Lexer<'_>,
        list: &ListBuilder,
    ) -> Result<Parsed> {
        let mut partial = list.finish(lx.pos());
        // Bits of an entity that never became a record still count.
        partial.flags = list.flags().union(lx.take_flags());
        let outcome = match halt {
            Ok(()) => Ok(partial),
            Err(Halt::Syntax) => Err(ImfError::Syntax {
                flags: partial.flags,
                partial,
            }),
            Err(Halt::NoMemory(requested)) => Err(ImfError::NoMemory { requested, partial }),
        };
        match &outcome {
            Ok(parsed) => debug!(
                kind,
                records = parsed.len,
                flags = %parsed.flags,
                "Parsed header body"
            ),
            Err(e) => debug!(
                kind,
                records = partial.len,
                code = e.code(),
                stopped_at = partial.stopped_at,
                "Header body failed to parse"
            ),
        }
        outcome
    }
}

/// Parse an address header body with `mode` and the default input ceiling.
///
/// # Errors
///
/// See [`Parser::parse_addr_header`].
pub fn parse_addr_header(
    input: impl AsRef<[u8]>,
    mode: Mode,
    bag: &mut Bag<Address>,
) -> Result<Parsed> {
    Parser::new(mode).parse_addr_header(input, bag)
}

/// Tokenize a structured header body with `mode` and the default input
/// ceiling.
///
/// # Errors
///
/// See [`Parser::parse_addr_header`].
pub fn parse_struct_header(
    input: impl AsRef<[u8]>,
    mode: Mode,
    bag: &mut Bag<Token>,
) -> Result<Parsed> {
    Parser::new(mode).parse_struct_header(input, bag)
}
