//! Cursor and lookahead primitives shared by both state machines.
//!
//! The lexer owns the position into the logical input and the state/error
//! word of the entity currently being parsed. Every primitive reports
//! syntax errors through [`Lexer::fault`], which either records the bits and
//! lets the caller continue (relax mode) or halts the parse.

use super::chars::{self, CR, LF};
use super::flags::{Faults, Flags, Mode, State};

/// Why a parse stopped before the end of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    /// A syntax error outside relax mode. The bits are in [`Lexer::flags`].
    Syntax,
    /// The memory bag refused an allocation of this many bytes.
    NoMemory(usize),
}

pub(crate) type Step<T = ()> = Result<T, Halt>;

/// Outcome of [`Lexer::skip_fws`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Fws {
    None,
    /// Moved over CR/LF only.
    Break,
    /// Consumed at least one SP or HT.
    Space,
}

/// Outcome of [`Lexer::skip_cfws`], ordered by significance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Cfws {
    None,
    /// Moved over CR/LF only.
    Break,
    /// Crossed at least one comment; any SP/HT seen was inside comments.
    Comment,
    /// Consumed SP/HT outside of comments.
    Space,
}

impl Cfws {
    /// Whether this run separates two words.
    pub(crate) fn separates(self) -> bool {
        self >= Self::Comment
    }
}

pub(crate) struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    mode: Mode,
    /// State and error bits of the entity being parsed.
    pub(crate) flags: Flags,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a [u8], mode: Mode) -> Self {
        Self {
            input,
            pos: 0,
            mode,
            flags: Flags::default(),
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub(crate) fn bump(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    /// Hand over the bits collected for the finished entity.
    pub(crate) fn take_flags(&mut self) -> Flags {
        std::mem::take(&mut self.flags)
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.flags.state |= state;
    }

    /// Record `faults`; halt unless relax mode is active.
    pub(crate) fn fault(&mut self, faults: Faults) -> Step {
        self.flags.faults |= faults;
        if self.mode.contains(Mode::RELAX) {
            self.flags.faults |= Faults::RELAX;
            self.flags.state |= State::RELAXED;
            Ok(())
        } else {
            Err(Halt::Syntax)
        }
    }

    /// Advance over SP, HT, CR and LF in any order.
    ///
    /// Lone CR or LF are accepted; unfolding is not enforced.
    pub(crate) fn skip_fws(&mut self) -> Fws {
        let mut seen = Fws::None;
        while let Some(b) = self.peek() {
            if chars::is_wsp(b) {
                seen = Fws::Space;
            } else if chars::is(b, CR | LF) {
                seen = seen.max(Fws::Break);
            } else {
                break;
            }
            self.pos += 1;
        }
        seen
    }

    /// Advance over folding whitespace and comments.
    ///
    /// Comment content is appended to `comments`, space-joined to whatever
    /// the buffer already holds.
    pub(crate) fn skip_cfws(&mut self, comments: &mut Vec<u8>) -> Step<Cfws> {
        self.skip_cfws_counted(comments).map(|(seen, _)| seen)
    }

    /// [`Lexer::skip_cfws`], also returning how many comments were crossed.
    /// Empty comments count.
    pub(crate) fn skip_cfws_counted(&mut self, comments: &mut Vec<u8>) -> Step<(Cfws, usize)> {
        let mut seen = Cfws::None;
        let mut crossed = 0;
        loop {
            match self.skip_fws() {
                Fws::Space => seen = Cfws::Space,
                Fws::Break => seen = seen.max(Cfws::Break),
                Fws::None => {}
            }
            if self.peek() != Some(b'(') {
                return Ok((seen, crossed));
            }
            self.comment(comments)?;
            crossed += 1;
            seen = seen.max(Cfws::Comment);
        }
    }

    /// Parse one comment, nested parentheses included, starting at `(`.
    ///
    /// Nesting is tracked with a depth counter, so arbitrarily deep input
    /// costs no stack.
    fn comment(&mut self, out: &mut Vec<u8>) -> Step {
        debug_assert_eq!(self.peek(), Some(b'('));
        self.pos += 1;

        let joined = !out.is_empty();
        if joined {
            out.push(b' ');
        }
        let start = out.len();
        let mut depth = 1usize;
        let mut space = false;

        loop {
            let Some(b) = self.peek() else {
                self.fault(Faults::COMMENT)?;
                break;
            };
            match b {
                b'(' => {
                    push_spaced(out, start, &mut space, b);
                    depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    space = false;
                    out.push(b')');
                }
                b'\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            push_spaced(out, start, &mut space, c);
                            self.pos += 1;
                        }
                        None => {
                            self.fault(Faults::COMMENT)?;
                            break;
                        }
                    }
                }
                _ if chars::is_fws(b) => {
                    if self.skip_fws() == Fws::Space {
                        space = true;
                    }
                }
                _ if chars::is_ctext(b) => {
                    push_spaced(out, start, &mut space, b);
                    self.pos += 1;
                }
                _ => {
                    self.fault(Faults::COMMENT)?;
                    push_spaced(out, start, &mut space, b);
                    self.pos += 1;
                }
            }
        }

        if joined && out.len() == start {
            out.pop();
        }
        Ok(())
    }

    /// Parse a quoted string starting at `"` and append its dequoted content.
    ///
    /// Runs of folding whitespace collapse to one space; a space that would
    /// precede the closing quote is dropped. Quoted-pairs yield the escaped
    /// byte.
    pub(crate) fn quoted_string(&mut self, out: &mut Vec<u8>) -> Step {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.pos += 1;
        let mut space = false;

        loop {
            let Some(b) = self.peek() else {
                return self.fault(Faults::QUOTE);
            };
            match b {
                b'"' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            push_spaced(out, 0, &mut space, c);
                            self.pos += 1;
                        }
                        None => return self.fault(Faults::QUOTE),
                    }
                }
                _ if chars::is_fws(b) => {
                    if self.skip_fws() == Fws::Space {
                        space = true;
                    }
                }
                _ if chars::is_qtext(b) => {
                    push_spaced(out, 0, &mut space, b);
                    self.pos += 1;
                }
                _ => {
                    self.fault(Faults::QUOTE)?;
                    push_spaced(out, 0, &mut space, b);
                    self.pos += 1;
                }
            }
        }
    }

    /// Append a run of atext and return its length.
    ///
    /// Raw 8-bit bytes are content errors; relaxed, they join the atom.
    pub(crate) fn atom(&mut self, out: &mut Vec<u8>) -> Step<usize> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !chars::is_atext(b) {
                if b < 0x80 {
                    break;
                }
                self.fault(Faults::CONTENT)?;
            }
            out.push(b);
            self.pos += 1;
        }
        Ok(self.pos - start)
    }

    /// Parse a domain literal starting at `[`, brackets included in `out`.
    ///
    /// Folding whitespace inside the brackets is dropped; quoted-pairs are
    /// kept verbatim.
    pub(crate) fn domain_literal(&mut self, out: &mut Vec<u8>) -> Step {
        debug_assert_eq!(self.peek(), Some(b'['));
        self.pos += 1;
        out.push(b'[');

        loop {
            let Some(b) = self.peek() else {
                self.fault(Faults::CONTENT)?;
                break;
            };
            match b {
                b']' => {
                    self.pos += 1;
                    break;
                }
                b'\\' => {
                    self.pos += 1;
                    out.push(b'\\');
                    if let Some(c) = self.peek() {
                        out.push(c);
                        self.pos += 1;
                    }
                }
                _ if chars::is_fws(b) => {
                    self.skip_fws();
                }
                _ if chars::is_dtext(b) => {
                    out.push(b);
                    self.pos += 1;
                }
                _ => {
                    self.fault(Faults::CONTENT)?;
                    out.push(b);
                    self.pos += 1;
                }
            }
        }

        out.push(b']');
        Ok(())
    }
}

/// Push `b`, preceded by the pending collapsed space if any.
///
/// A pending space is dropped while nothing has been written past `start`;
/// `start == 0` keeps a leading space (quoted strings).
fn push_spaced(out: &mut Vec<u8>, start: usize, space: &mut bool, b: u8) {
    if *space && (start == 0 || out.len() > start) {
        out.push(b' ');
    }
    *space = false;
    out.push(b);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer(input: &str) -> Lexer<'_> {
        Lexer::new(input.as_bytes(), Mode::empty())
    }

    #[test]
    fn test_skip_fws_outcomes() {
        let mut lx = lexer(" \t\r\n x");
        assert_eq!(lx.skip_fws(), Fws::Space);
        assert_eq!(lx.peek(), Some(b'x'));

        let mut lx = lexer("\r\nx");
        assert_eq!(lx.skip_fws(), Fws::Break);

        let mut lx = lexer("x");
        assert_eq!(lx.skip_fws(), Fws::None);
        assert_eq!(lx.pos(), 0);
    }

    #[test]
    fn test_skip_cfws_joins_comments() {
        let mut lx = lexer("(one) (two\\) still two)x");
        let mut comments = Vec::new();
        assert_eq!(lx.skip_cfws(&mut comments).unwrap(), Cfws::Space);
        assert_eq!(comments, b"one two) still two");
        assert_eq!(lx.peek(), Some(b'x'));
    }

    #[test]
    fn test_skip_cfws_counts_empty_comments() {
        let mut lx = lexer("() (x)y");
        let mut comments = Vec::new();
        assert_eq!(lx.skip_cfws_counted(&mut comments).unwrap(), (Cfws::Space, 2));
        assert_eq!(comments, b"x");
        assert_eq!(lx.peek(), Some(b'y'));
    }

    #[test]
    fn test_comment_without_outer_space() {
        let mut lx = lexer("(a  b)x");
        let mut comments = Vec::new();
        assert_eq!(lx.skip_cfws(&mut comments).unwrap(), Cfws::Comment);
        assert_eq!(comments, b"a b");
    }

    #[test]
    fn test_nested_comment() {
        let mut lx = lexer("(outer (inner) tail)");
        let mut comments = Vec::new();
        lx.skip_cfws(&mut comments).unwrap();
        assert_eq!(comments, b"outer (inner) tail");
        assert_eq!(lx.peek(), None);
    }

    #[test]
    fn test_unterminated_comment() {
        let mut lx = lexer("(never closed");
        let mut comments = Vec::new();
        assert_eq!(lx.skip_cfws(&mut comments), Err(Halt::Syntax));
        assert!(lx.flags.faults.contains(Faults::COMMENT));

        let mut lx = Lexer::new(b"(never closed", Mode::RELAX);
        let mut comments = Vec::new();
        assert!(lx.skip_cfws(&mut comments).is_ok());
        assert_eq!(comments, b"never closed");
        assert!(lx.flags.faults.contains(Faults::COMMENT | Faults::RELAX));
        assert!(lx.flags.state.contains(State::RELAXED));
    }

    #[test]
    fn test_deep_nesting_needs_no_stack() {
        let input = format!("{}x{}", "(".repeat(100_000), ")".repeat(100_000));
        let mut lx = lexer(&input);
        let mut comments = Vec::new();
        assert!(lx.skip_cfws(&mut comments).is_ok());
        assert_eq!(lx.peek(), None);
    }

    #[test]
    fn test_quoted_string_collapses_whitespace() {
        let mut lx = lexer("\"a \r\n\t b \"rest");
        let mut out = Vec::new();
        lx.quoted_string(&mut out).unwrap();
        assert_eq!(out, b"a b");
        assert_eq!(lx.peek(), Some(b'r'));
    }

    #[test]
    fn test_quoted_string_pairs() {
        let mut lx = lexer(r#""say \"hi\" \\ ok""#);
        let mut out = Vec::new();
        lx.quoted_string(&mut out).unwrap();
        assert_eq!(out, br#"say "hi" \ ok"#);
    }

    #[test]
    fn test_unterminated_quote() {
        let mut lx = lexer("\"open");
        let mut out = Vec::new();
        assert_eq!(lx.quoted_string(&mut out), Err(Halt::Syntax));
        assert!(lx.flags.faults.contains(Faults::QUOTE));
    }

    #[test]
    fn test_atom_rejects_eight_bit() {
        let mut lx = Lexer::new("caf\u{e9}".as_bytes(), Mode::empty());
        let mut out = Vec::new();
        assert_eq!(lx.atom(&mut out), Err(Halt::Syntax));

        let mut lx = Lexer::new("caf\u{e9}".as_bytes(), Mode::RELAX);
        let mut out = Vec::new();
        assert_eq!(lx.atom(&mut out), Ok(5));
        assert_eq!(String::from_utf8(out).unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_domain_literal() {
        let mut lx = lexer("[ 192.0.2.1 ]>");
        let mut out = Vec::new();
        lx.domain_literal(&mut out).unwrap();
        assert_eq!(out, b"[192.0.2.1]");
        assert_eq!(lx.peek(), Some(b'>'));
    }
}
