//! Tokenizer for structured header bodies other than address lists.
//!
//! A token is a run of atext (plus `.` in dot-atom mode) and quoted-string
//! content. CFWS ends a token, and so does an unquoted `;` when semicolons
//! are enabled. Comments either ride along in the token's side-channel or,
//! in comment-token mode, become tokens of their own.

use std::mem;

use super::chars;
use super::flags::{Faults, Mode, State};
use super::lex::{Lexer, Step};
use super::record::{self, ListBuilder};
use crate::model::token::Token;
use crate::store::bag::Bag;

#[derive(Debug, Default)]
struct Pending {
    text: Vec<u8>,
    comment: Vec<u8>,
    /// Some of `text` came from a quoted string.
    quoted: bool,
    /// A token is open, even if its text is still empty.
    started: bool,
}

pub(crate) fn parse(lx: &mut Lexer<'_>, bag: &mut Bag<Token>, list: &mut ListBuilder) -> Step {
    Tokenizer {
        lx,
        bag,
        list,
        tok: Pending::default(),
        comments: Vec::new(),
    }
    .run()
}

struct Tokenizer<'p, 'a> {
    lx: &'p mut Lexer<'a>,
    bag: &'p mut Bag<Token>,
    list: &'p mut ListBuilder,
    tok: Pending,
    /// Comment run collected in comment-token mode.
    comments: Vec<u8>,
}

impl Tokenizer<'_, '_> {
    fn run(&mut self) -> Step {
        let mode = self.lx.mode();
        let comment_tokens = mode.contains(Mode::COMMENT_TOKENS);
        let keep_empty = mode.contains(Mode::EMPTY_TOKENS);
        loop {
            let mut comment_run = false;
            let cfws = if comment_tokens {
                self.comments.clear();
                let (cfws, crossed) = self.lx.skip_cfws_counted(&mut self.comments)?;
                comment_run = !self.comments.is_empty() || (crossed > 0 && keep_empty);
                cfws
            } else {
                let before = self.tok.comment.len();
                let cfws = self.lx.skip_cfws(&mut self.tok.comment)?;
                if self.tok.comment.len() > before {
                    self.lx.set_state(State::COMMENT);
                }
                cfws
            };
            if cfws.separates() && self.flush()? {
                return Ok(());
            }
            if comment_run && self.emit_comment()? {
                return Ok(());
            }

            let Some(b) = self.lx.peek() else {
                break;
            };
            match b {
                b'"' => {
                    self.tok.started = true;
                    self.tok.quoted = true;
                    self.lx.quoted_string(&mut self.tok.text)?;
                }
                b'.' if mode.contains(Mode::DOT_ATOM) => {
                    self.lx.bump();
                    self.tok.started = true;
                    self.tok.text.push(b'.');
                }
                b';' if mode.contains(Mode::SEMICOLON) => {
                    self.lx.bump();
                    self.tok.started = true;
                    self.lx.set_state(State::SEMICOLON);
                    if self.flush()? {
                        return Ok(());
                    }
                }
                _ if chars::is_atext(b) || b >= 0x80 => {
                    self.tok.started = true;
                    self.lx.atom(&mut self.tok.text)?;
                }
                _ => {
                    self.lx.fault(Faults::CONTENT)?;
                    self.lx.bump();
                    if self.flush()? {
                        return Ok(());
                    }
                }
            }
        }
        self.flush()?;
        Ok(())
    }

    /// Close the open token. Returns whether parsing should stop.
    fn flush(&mut self) -> Step<bool> {
        if !self.tok.started {
            return Ok(false);
        }
        let tok = mem::take(&mut self.tok);
        if tok.text.is_empty() && !self.lx.mode().contains(Mode::EMPTY_TOKENS) {
            self.lx.flags.state.remove(State::SEMICOLON);
            self.tok.comment = tok.comment;
            return Ok(false);
        }

        let text = if tok.quoted && !tok.text.is_empty() && !self.is_atom(&tok.text) {
            record::quote(&tok.text)
        } else {
            tok.text
        };
        let flags = self.lx.take_flags();
        let id = record::build(self.bag, [&text[..], &tok.comment[..]], flags, Token::from_parts)?;
        self.list.link(id, flags);
        Ok(self.lx.mode().contains(Mode::STOP_EARLY))
    }

    /// Emit the collected comment run as a token of its own.
    fn emit_comment(&mut self) -> Step<bool> {
        if self.flush()? {
            return Ok(true);
        }
        self.lx.set_state(State::COMMENT);
        let flags = self.lx.take_flags();
        let id = record::build(self.bag, [&self.comments[..], &[][..]], flags, Token::from_parts)?;
        self.comments.clear();
        self.list.link(id, flags);
        Ok(self.lx.mode().contains(Mode::STOP_EARLY))
    }

    fn is_atom(&self, text: &[u8]) -> bool {
        if self.lx.mode().contains(Mode::DOT_ATOM) {
            chars::is_dot_atom_text(text)
        } else {
            chars::is_atom_text(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::token::Token;
    use crate::parser::flags::{Faults, Mode, State};
    use crate::parser::parse_struct_header;
    use crate::store::bag::Bag;

    fn tokens(input: &str, mode: Mode) -> Vec<Token> {
        let mut bag = Bag::new();
        let parsed = parse_struct_header(input, mode, &mut bag).unwrap();
        parsed.records(&bag).cloned().collect()
    }

    fn texts(input: &str, mode: Mode) -> Vec<String> {
        tokens(input, mode).iter().map(|t| t.text().to_string()).collect()
    }

    #[test]
    fn test_atoms_split_on_whitespace() {
        assert_eq!(texts("  alpha\r\n beta\tgamma ", Mode::empty()), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_dot_needs_dot_atom_mode() {
        let mut bag = Bag::new();
        let err = parse_struct_header("1.0", Mode::empty(), &mut bag).unwrap_err();
        assert!(err.code() & Faults::CONTENT.bits() as i32 != 0);

        assert_eq!(texts("1.0", Mode::DOT_ATOM), ["1.0"]);
    }

    #[test]
    fn test_semicolon_terminates_tokens() {
        let list = tokens("text/plain; charset=\"us-ascii\"", Mode::SEMICOLON);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text(), "text/plain");
        assert!(list[0].flags().state.contains(State::SEMICOLON));
        assert_eq!(list[1].text(), "charset=us-ascii");
        assert!(!list[1].flags().state.contains(State::SEMICOLON));

        let mut bag = Bag::new();
        let err = parse_struct_header("a; b", Mode::empty(), &mut bag).unwrap_err();
        assert!(err.code() > 0);
    }

    #[test]
    fn test_quoted_content_is_requoted_only_when_needed() {
        assert_eq!(
            texts("\"hello \r\n   world\" \"plain\"", Mode::empty()),
            ["\"hello world\"", "plain"]
        );
        assert_eq!(texts("\"v1.2\"", Mode::DOT_ATOM), ["v1.2"]);
        assert_eq!(texts("\"v1.2\"", Mode::empty()), ["\"v1.2\""]);
    }

    #[test]
    fn test_quoted_string_joins_adjacent_atom() {
        assert_eq!(texts("pre\"fix\"", Mode::empty()), ["prefix"]);
    }

    #[test]
    fn test_comments_fold_into_side_channel() {
        let list = tokens("a (note) b", Mode::empty());
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text(), "a");
        assert_eq!(list[0].comment(), "note");
        assert!(list[0].flags().state.contains(State::COMMENT));
        assert_eq!(list[1].comment(), "");
        assert!(!list[0].is_comment());
    }

    #[test]
    fn test_leading_comment_belongs_to_first_token() {
        let list = tokens("(lead) a", Mode::empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].comment(), "lead");
    }

    #[test]
    fn test_comment_tokens_mode() {
        let list = tokens("a (one) (two) b", Mode::COMMENT_TOKENS);
        let texts: Vec<&str> = list.iter().map(Token::text).collect();
        assert_eq!(texts, ["a", "one two", "b"]);
        assert!(list[1].is_comment());
        assert!(!list[0].is_comment());
        assert_eq!(list[0].comment(), "");
    }

    #[test]
    fn test_empty_comment_token() {
        assert_eq!(texts("a () b", Mode::COMMENT_TOKENS), ["a", "b"]);

        let list = tokens("a () b", Mode::COMMENT_TOKENS | Mode::EMPTY_TOKENS);
        let texts: Vec<&str> = list.iter().map(Token::text).collect();
        assert_eq!(texts, ["a", "", "b"]);
        assert!(list[1].is_comment());

        let list = tokens("()", Mode::COMMENT_TOKENS | Mode::EMPTY_TOKENS);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].text(), "");
        assert!(list[0].is_comment());
    }

    #[test]
    fn test_empty_tokens() {
        assert_eq!(texts("\"\" a", Mode::empty()), ["a"]);
        assert_eq!(texts("\"\" a", Mode::EMPTY_TOKENS), ["", "a"]);
        assert_eq!(
            texts("a;;b", Mode::SEMICOLON | Mode::EMPTY_TOKENS),
            ["a", "", "b"]
        );
    }

    #[test]
    fn test_dropped_empty_token_keeps_no_semicolon_bit() {
        let list = tokens("a; ; b", Mode::SEMICOLON);
        assert_eq!(list.len(), 2);
        assert!(!list[1].flags().state.contains(State::SEMICOLON));
    }

    #[test]
    fn test_stop_early() {
        let mut bag = Bag::new();
        let parsed = parse_struct_header("a b c", Mode::STOP_EARLY, &mut bag).unwrap();
        assert_eq!(parsed.len, 1);
    }

    #[test]
    fn test_relaxed_stray_byte() {
        let mut bag = Bag::new();
        let parsed = parse_struct_header("a @ b", Mode::RELAX, &mut bag).unwrap();
        assert_eq!(parsed.len, 2);
        assert!(parsed.flags.faults.contains(Faults::CONTENT | Faults::RELAX));
        assert!(parsed.flags.state.contains(State::RELAXED));
    }

    #[test]
    fn test_comment_only_body_is_empty_list() {
        let mut bag = Bag::new();
        let parsed = parse_struct_header("(nothing here)", Mode::empty(), &mut bag).unwrap();
        assert!(parsed.is_empty());
        assert!(bag.is_empty());
    }
}
