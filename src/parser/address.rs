//! Address-list state machine (RFC 5322 §3.4 plus the §4.4 obsolete forms).
//!
//! Each entity (mailbox, or the marker of an empty group) walks through four
//! coarse stages. Free text stays ambiguous until `@` turns it into a
//! local-part or `<` turns it into a display-name; a `:` turns it into a
//! group display-name instead. Records are built only once the separator
//! that ends an entity has been seen, so group boundary bits are known at
//! construction time.

use std::mem;

use super::chars;
use super::flags::{Faults, Mode, State};
use super::lex::{Lexer, Step};
use super::record::{self, ListBuilder};
use crate::model::address::Address;
use crate::store::bag::Bag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Could still become a display-name or a local-part.
    Free,
    /// Free text holding an unquoted dot (`dot-atom-text` or an obsolete
    /// display-name).
    Dotted,
    /// Inside `<...>`.
    Angle,
    /// The addr-spec is complete; an explicit separator must come next.
    Domain,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Seen: u8 {
        /// Any content at all.
        const ANY = 1 << 0;
        /// Separating whitespace is pending before the next word.
        const SPACE = 1 << 1;
        /// The current word run contains a quoted string.
        const QUOTE = 1 << 2;
        /// An obsolete route was skipped.
        const ROUTE = 1 << 3;
        /// Two words are separated by whitespace, not by a dot.
        const SPACED = 1 << 4;
    }
}

/// How an entity ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Comma,
    GroupClose,
    Eof,
}

#[derive(Debug, Default)]
struct Group {
    open: bool,
    /// Display-name, until the first member takes it.
    name: Option<Vec<u8>>,
    members: usize,
}

/// Substrings collected for one entity.
#[derive(Debug, Default)]
struct Entity {
    /// Free text as displayed: words joined by single spaces.
    phrase: Vec<u8>,
    /// The same words without whitespace, for use as a local-part.
    local: Vec<u8>,
    display: Vec<u8>,
    locpar: Vec<u8>,
    domain: Vec<u8>,
    comment: Vec<u8>,
    seen: Seen,
}

impl Entity {
    fn before_word(&mut self) {
        if self.seen.contains(Seen::SPACE) && !self.phrase.is_empty() {
            self.phrase.push(b' ');
            if !self.local.ends_with(b".") {
                self.seen |= Seen::SPACED;
            }
        }
        self.seen.remove(Seen::SPACE);
        self.seen |= Seen::ANY;
    }

    fn dot(&mut self) {
        if self.seen.contains(Seen::SPACE) && !self.phrase.is_empty() {
            self.phrase.push(b' ');
        }
        self.seen.remove(Seen::SPACE);
        self.seen |= Seen::ANY;
        self.phrase.push(b'.');
        self.local.push(b'.');
    }

    /// Take the free text, forgetting everything that described it.
    fn take_phrase(&mut self) -> Vec<u8> {
        self.local.clear();
        self.seen.remove(Seen::SPACE | Seen::QUOTE | Seen::SPACED);
        mem::take(&mut self.phrase)
    }
}

pub(crate) fn parse(lx: &mut Lexer<'_>, bag: &mut Bag<Address>, list: &mut ListBuilder) -> Step {
    AddrParser {
        lx,
        bag,
        list,
        group: Group::default(),
        carry: Vec::new(),
        scratch: Vec::new(),
    }
    .run()
}

struct AddrParser<'p, 'a> {
    lx: &'p mut Lexer<'a>,
    bag: &'p mut Bag<Address>,
    list: &'p mut ListBuilder,
    group: Group,
    /// Comments seen after a list comma, owed to the next entity.
    carry: Vec<u8>,
    scratch: Vec<u8>,
}

impl AddrParser<'_, '_> {
    fn run(&mut self) -> Step {
        loop {
            let mut ent = Entity {
                comment: mem::take(&mut self.carry),
                ..Entity::default()
            };
            let end = self.entity(&mut ent)?;
            let built = self.complete(ent, end)?;
            if built && self.lx.mode().contains(Mode::STOP_EARLY) {
                return Ok(());
            }
            if end == End::Eof {
                if self.list.len() == 0 {
                    return self.lx.fault(Faults::CONTENT);
                }
                return Ok(());
            }
        }
    }

    /// Scan one entity up to and including its separator.
    fn entity(&mut self, ent: &mut Entity) -> Step<End> {
        let mut stage = Stage::Free;
        loop {
            if self.lx.skip_cfws(&mut ent.comment)?.separates() {
                ent.seen |= Seen::SPACE;
            }
            let Some(b) = self.lx.peek() else {
                self.settle(ent, stage)?;
                return Ok(End::Eof);
            };

            if stage == Stage::Domain {
                if b == b',' || b == b';' {
                    return self.separator(ent, b);
                }
                self.lx.fault(Faults::CONTENT)?;
                self.lx.bump();
                continue;
            }

            match b {
                b'"' => self.quoted_word(ent)?,
                b'.' => {
                    self.lx.bump();
                    ent.dot();
                    if stage == Stage::Free {
                        stage = Stage::Dotted;
                    }
                }
                b'@' => {
                    self.lx.bump();
                    self.resolve_local(ent)?;
                    self.domain(ent)?;
                    if stage == Stage::Angle {
                        self.close_angle(ent)?;
                    }
                    stage = Stage::Domain;
                }
                b'<' if stage != Stage::Angle => {
                    self.lx.bump();
                    self.display_name(ent, stage)?;
                    self.route(ent)?;
                    stage = Stage::Angle;
                }
                b'>' if stage == Stage::Angle => {
                    self.lx.bump();
                    self.no_domain(ent)?;
                    stage = Stage::Domain;
                }
                b':' if stage != Stage::Angle => {
                    self.lx.bump();
                    self.open_group(ent, stage)?;
                    stage = Stage::Free;
                }
                b',' | b';' if stage != Stage::Angle => {
                    self.settle(ent, stage)?;
                    return self.separator(ent, b);
                }
                _ if chars::is_atext(b) || b >= 0x80 => self.atom_word(ent)?,
                _ => {
                    self.lx.fault(Faults::CONTENT)?;
                    self.lx.bump();
                }
            }
        }
    }

    /// Consume `,` or `;` and decide how the entity ends.
    ///
    /// Empty list elements and CFWS after a comma are looked through, so the
    /// last member of a group or list is recognized as such.
    fn separator(&mut self, ent: &mut Entity, b: u8) -> Step<End> {
        self.lx.bump();
        if b == b';' {
            if self.group.open {
                return Ok(End::GroupClose);
            }
            self.lx.fault(Faults::CONTENT)?;
        }
        loop {
            self.lx.skip_cfws(&mut self.carry)?;
            if self.lx.peek() != Some(b',') {
                break;
            }
            self.lx.bump();
        }
        let end = match self.lx.peek() {
            None => End::Eof,
            Some(b';') if self.group.open => {
                self.lx.bump();
                End::GroupClose
            }
            Some(_) => return Ok(End::Comma),
        };
        let carried = mem::take(&mut self.carry);
        join_comment(&mut ent.comment, &carried);
        Ok(end)
    }

    /// Resolve whatever is left unresolved when an entity ends.
    fn settle(&mut self, ent: &mut Entity, stage: Stage) -> Step {
        match stage {
            Stage::Domain => Ok(()),
            Stage::Angle => {
                self.lx.fault(Faults::CONTENT)?;
                if !ent.local.is_empty() {
                    self.resolve_local(ent)?;
                }
                Ok(())
            }
            Stage::Free | Stage::Dotted => {
                if !ent.seen.contains(Seen::ANY) {
                    return Ok(());
                }
                let word = !ent.local.is_empty() && !ent.seen.contains(Seen::SPACED);
                if word && self.lx.mode().contains(Mode::ADDR_SPEC_NO_DOMAIN) {
                    self.lx.set_state(State::ADDR_SPEC_NO_DOMAIN);
                    return self.resolve_local(ent);
                }
                self.lx.fault(Faults::CONTENT)?;
                ent.display = record::phrase(ent.take_phrase());
                Ok(())
            }
        }
    }

    /// Link the finished entity. Returns whether a record was built.
    fn complete(&mut self, mut ent: Entity, end: End) -> Step<bool> {
        if end == End::Eof && self.group.open {
            self.lx.fault(Faults::GROUP_OPEN)?;
        }
        let closes = self.group.open && end != End::Comma;
        let mut state = State::empty();
        if self.group.open {
            state |= State::GROUP;
            if self.group.name.is_some() {
                state |= State::GROUP_START;
            }
            if closes {
                state |= State::GROUP_END;
            }
        }

        let built = if ent.seen.contains(Seen::ANY) {
            self.link(&ent, state)?;
            self.group.members += 1;
            true
        } else if closes && self.group.members == 0 {
            self.link(&ent, state | State::GROUP_EMPTY)?;
            true
        } else {
            self.carry = mem::take(&mut ent.comment);
            false
        };

        if closes {
            self.group = Group::default();
        }
        Ok(built)
    }

    fn link(&mut self, ent: &Entity, state: State) -> Step {
        self.lx.set_state(state);
        let flags = self.lx.take_flags();
        let group = self.group.name.take().unwrap_or_default();
        let fields = [
            group.as_slice(),
            ent.display.as_slice(),
            ent.locpar.as_slice(),
            ent.domain.as_slice(),
            ent.comment.as_slice(),
        ];
        let id = record::build(self.bag, fields, flags, Address::from_parts)?;
        self.list.link(id, flags);
        Ok(())
    }

    fn quoted_word(&mut self, ent: &mut Entity) -> Step {
        ent.before_word();
        self.scratch.clear();
        self.lx.quoted_string(&mut self.scratch)?;
        ent.phrase.extend_from_slice(&self.scratch);
        ent.local.extend_from_slice(&self.scratch);
        ent.seen |= Seen::QUOTE;
        Ok(())
    }

    fn atom_word(&mut self, ent: &mut Entity) -> Step {
        ent.before_word();
        let start = ent.phrase.len();
        self.lx.atom(&mut ent.phrase)?;
        ent.local.extend_from_slice(&ent.phrase[start..]);
        Ok(())
    }

    /// Turn the collected words into the local-part.
    ///
    /// Quoting is re-derived: the dequoted text is emitted bare when it is a
    /// valid dot-atom, and wrapped in one pair of quotes otherwise.
    fn resolve_local(&mut self, ent: &mut Entity) -> Step {
        let quoted = ent.seen.contains(Seen::QUOTE);
        if (ent.local.is_empty() && !quoted) || ent.seen.contains(Seen::SPACED) {
            self.lx.fault(Faults::CONTENT)?;
        }
        let local = mem::take(&mut ent.local);
        ent.take_phrase();
        ent.seen |= Seen::ANY;
        ent.locpar = if chars::is_dot_atom_text(&local) {
            local
        } else if quoted {
            record::quote(&local)
        } else {
            if !local.is_empty() {
                self.lx.fault(Faults::CONTENT)?;
            }
            local
        };
        Ok(())
    }

    /// Turn the collected words into the display-name, quoted only when
    /// its content is not a plain run of atoms.
    fn display_name(&mut self, ent: &mut Entity, stage: Stage) -> Step {
        if stage == Stage::Dotted {
            self.dotted_name()?;
        }
        ent.display = record::phrase(ent.take_phrase());
        ent.seen |= Seen::ANY;
        Ok(())
    }

    fn dotted_name(&mut self) -> Step {
        if self.lx.mode().contains(Mode::DISPLAY_NAME_DOT) {
            self.lx.set_state(State::DISPLAY_NAME_DOT);
            Ok(())
        } else {
            self.lx.fault(Faults::DISPLAY_NAME_DOT)
        }
    }

    /// Skip an obsolete source route (`@hop,@hop:`) right after `<`.
    fn route(&mut self, ent: &mut Entity) -> Step {
        self.lx.skip_cfws(&mut ent.comment)?;
        if self.lx.peek() != Some(b'@') {
            return Ok(());
        }
        ent.seen |= Seen::ROUTE;
        let mut hop = Vec::new();
        loop {
            self.lx.bump();
            hop.clear();
            self.domain_into(&mut hop, &mut ent.comment)?;
            loop {
                self.lx.skip_cfws(&mut ent.comment)?;
                if self.lx.peek() != Some(b',') {
                    break;
                }
                self.lx.bump();
            }
            match self.lx.peek() {
                Some(b'@') => {}
                Some(b':') => {
                    self.lx.bump();
                    return Ok(());
                }
                _ => return self.lx.fault(Faults::CONTENT),
            }
        }
    }

    fn domain(&mut self, ent: &mut Entity) -> Step {
        if self.domain_into(&mut ent.domain, &mut ent.comment)? {
            self.lx.set_state(State::DOMAIN_LITERAL);
        }
        Ok(())
    }

    /// Parse a dot-atom domain (CFWS allowed around dots) or a literal.
    /// Returns whether it was a literal.
    fn domain_into(&mut self, out: &mut Vec<u8>, comments: &mut Vec<u8>) -> Step<bool> {
        self.lx.skip_cfws(comments)?;
        if self.lx.peek() == Some(b'[') {
            self.lx.domain_literal(out)?;
            return Ok(true);
        }
        loop {
            if self.lx.atom(out)? == 0 {
                self.lx.fault(Faults::CONTENT)?;
                return Ok(false);
            }
            self.lx.skip_cfws(comments)?;
            if self.lx.peek() != Some(b'.') {
                return Ok(false);
            }
            self.lx.bump();
            out.push(b'.');
            self.lx.skip_cfws(comments)?;
        }
    }

    fn close_angle(&mut self, ent: &mut Entity) -> Step {
        self.lx.skip_cfws(&mut ent.comment)?;
        if self.lx.peek() == Some(b'>') {
            self.lx.bump();
            Ok(())
        } else {
            self.lx.fault(Faults::CONTENT)
        }
    }

    /// `>` reached without `@domain`.
    fn no_domain(&mut self, ent: &mut Entity) -> Step {
        let bare = !ent.local.is_empty() || ent.seen.contains(Seen::QUOTE);
        if !bare || ent.seen.contains(Seen::ROUTE) {
            self.lx.fault(Faults::CONTENT)?;
        } else if self.lx.mode().contains(Mode::ADDR_SPEC_NO_DOMAIN) {
            self.lx.set_state(State::ADDR_SPEC_NO_DOMAIN);
        } else {
            self.lx.fault(Faults::CONTENT)?;
        }
        if bare {
            self.resolve_local(ent)?;
        }
        Ok(())
    }

    /// `:` after free text. Groups hold exactly one level.
    fn open_group(&mut self, ent: &mut Entity, stage: Stage) -> Step {
        if self.group.open {
            self.lx.fault(Faults::CONTENT)?;
            ent.take_phrase();
            return Ok(());
        }
        if stage == Stage::Dotted {
            self.dotted_name()?;
        }
        let name = ent.take_phrase();
        if name.is_empty() {
            self.lx.fault(Faults::GROUP_DISPLAY_NAME_EMPTY)?;
        }
        ent.seen = Seen::empty();
        self.group = Group {
            open: true,
            name: Some(record::phrase(name)),
            members: 0,
        };
        Ok(())
    }
}

fn join_comment(dst: &mut Vec<u8>, more: &[u8]) {
    if more.is_empty() {
        return;
    }
    if !dst.is_empty() {
        dst.push(b' ');
    }
    dst.extend_from_slice(more);
}

#[cfg(test)]
mod tests {
    use crate::error::ImfError;
    use crate::model::address::Address;
    use crate::parser::flags::{Faults, Mode, State};
    use crate::parser::parse_addr_header;
    use crate::store::bag::Bag;

    fn parse(input: &str, mode: Mode) -> Vec<Address> {
        let mut bag = Bag::new();
        let parsed = parse_addr_header(input, mode, &mut bag).unwrap();
        parsed.records(&bag).cloned().collect()
    }

    fn fail(input: &str, mode: Mode) -> (i32, usize) {
        let mut bag = Bag::new();
        let err = parse_addr_header(input, mode, &mut bag).unwrap_err();
        let built = err.partial().map_or(0, |p| p.len);
        (err.code(), built)
    }

    #[test]
    fn test_bare_addr_spec() {
        let list = parse("user@example.com", Mode::empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].locpar(), "user");
        assert_eq!(list[0].domain(), "example.com");
        assert_eq!(list[0].display_name(), "");
        assert!(list[0].flags().is_clean());
    }

    #[test]
    fn test_display_name_words_are_joined() {
        let list = parse("  User   One\r\n <user1@example.com>", Mode::empty());
        assert_eq!(list[0].display_name(), "User One");
        assert_eq!(list[0].addr_spec(), "user1@example.com");
    }

    #[test]
    fn test_quoted_display_name_with_comma() {
        let list = parse("\"Last, First\" <a@b.com>, other@c.com", Mode::empty());
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name(), "\"Last, First\"");
        assert_eq!(list[1].addr_spec(), "other@c.com");

        let list = parse("\"Name\" <a@b.com>", Mode::empty());
        assert_eq!(list[0].display_name(), "Name");
    }

    #[test]
    fn test_display_output_parses_again() {
        for input in [
            "\"Last, First\" <a@b.com>",
            "\"a<b>\" <x@y>",
            "\"say \\\"hi\\\"\" <q@example.com>",
            "\"John Q. Public\" <jqp@example.com>",
            "\"john  doe\"@example.com",
        ] {
            let first = parse(input, Mode::empty());
            let shown = first[0].to_string();
            let again = parse(&shown, Mode::empty());
            assert_eq!(again[0].display_name(), first[0].display_name(), "shown: {shown}");
            assert_eq!(again[0].addr_spec(), first[0].addr_spec());
        }
    }

    #[test]
    fn test_group_display_name_is_requoted() {
        let list = parse("\"Team: ops\": a@b;", Mode::empty());
        assert_eq!(list[0].group_display_name(), "\"Team: ops\"");

        let list = parse("\"Team\": a@b;", Mode::empty());
        assert_eq!(list[0].group_display_name(), "Team");
    }

    #[test]
    fn test_dot_atom_local_part() {
        let list = parse("john.q.public@example.com", Mode::empty());
        assert_eq!(list[0].locpar(), "john.q.public");
    }

    #[test]
    fn test_obsolete_local_part_spacing() {
        let list = parse("john . doe @ example . com", Mode::empty());
        assert_eq!(list[0].locpar(), "john.doe");
        assert_eq!(list[0].domain(), "example.com");
    }

    #[test]
    fn test_quoted_local_part_is_requoted_only_when_needed() {
        let list = parse("\"john\"@example.com", Mode::empty());
        assert_eq!(list[0].locpar(), "john");

        let list = parse("\"john  doe\"@example.com", Mode::empty());
        assert_eq!(list[0].locpar(), "\"john doe\"");

        let list = parse(r#""a\"b"@example.com"#, Mode::empty());
        assert_eq!(list[0].locpar(), r#""a\"b""#);
    }

    #[test]
    fn test_spaced_words_are_not_a_local_part() {
        let (code, built) = fail("john doe@example.com", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
        assert_eq!(built, 0);
    }

    #[test]
    fn test_dotted_display_name() {
        let (code, _) = fail("John Q. Public <jqp@example.com>", Mode::empty());
        assert!(code & Faults::DISPLAY_NAME_DOT.bits() as i32 != 0);

        let list = parse("John Q. Public <jqp@example.com>", Mode::DISPLAY_NAME_DOT);
        assert_eq!(list[0].display_name(), "\"John Q. Public\"");
        assert!(list[0].flags().state.contains(State::DISPLAY_NAME_DOT));
        assert!(list[0].flags().is_clean());
    }

    #[test]
    fn test_quoted_dot_needs_no_permission() {
        let list = parse("\"John Q. Public\" <jqp@example.com>", Mode::empty());
        assert_eq!(list[0].display_name(), "\"John Q. Public\"");
        assert!(!list[0].flags().state.contains(State::DISPLAY_NAME_DOT));
    }

    #[test]
    fn test_comments_are_collected() {
        let list = parse("A (first) <a@b> (second)", Mode::empty());
        assert_eq!(list[0].display_name(), "A");
        assert_eq!(list[0].addr_spec(), "a@b");
        assert_eq!(list[0].comment(), "first second");

        let plain = parse("A <a@b>", Mode::empty());
        assert_eq!(plain[0].display_name(), list[0].display_name());
        assert_eq!(plain[0].locpar(), list[0].locpar());
        assert_eq!(plain[0].domain(), list[0].domain());
        assert_eq!(plain[0].comment(), "");
    }

    #[test]
    fn test_comment_after_comma_belongs_to_next() {
        let list = parse("a@b, (cee) c@d", Mode::empty());
        assert_eq!(list[0].comment(), "");
        assert_eq!(list[1].comment(), "cee");

        let list = parse("a@b, (trailing)", Mode::empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].comment(), "trailing");
    }

    #[test]
    fn test_domain_literal() {
        let list = parse("a@[192.0.2.1]", Mode::empty());
        assert_eq!(list[0].domain(), "[192.0.2.1]");
        assert!(list[0].flags().state.contains(State::DOMAIN_LITERAL));

        let list = parse("a@example.com", Mode::empty());
        assert!(!list[0].flags().state.contains(State::DOMAIN_LITERAL));
    }

    #[test]
    fn test_bad_domain_literals() {
        for input in ["a@[1.2", "a@[a[b]"] {
            let (code, built) = fail(input, Mode::empty());
            assert!(code > 0, "input: {input}");
            assert_eq!(built, 0, "input: {input}");

            let list = parse(input, Mode::RELAX);
            assert_eq!(list.len(), 1, "input: {input}");
            assert_eq!(list[0].locpar(), "a");
            let flags = list[0].flags();
            assert!(flags.state.contains(State::DOMAIN_LITERAL | State::RELAXED));
            assert!(flags.faults.contains(Faults::CONTENT | Faults::RELAX), "input: {input}");
        }
    }

    #[test]
    fn test_quoted_pair_in_domain_literal() {
        let list = parse(r"a@[\]]", Mode::empty());
        assert_eq!(list[0].domain(), r"[\]]");
        assert!(list[0].flags().state.contains(State::DOMAIN_LITERAL));
        assert!(list[0].flags().is_clean());
    }

    #[test]
    fn test_obsolete_route_is_discarded() {
        let list = parse("Relay <@hop1.example,@[10.0.0.1] , @hop3:user@dest.example>", Mode::empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].display_name(), "Relay");
        assert_eq!(list[0].addr_spec(), "user@dest.example");
        assert!(!list[0].flags().state.contains(State::DOMAIN_LITERAL));
    }

    #[test]
    fn test_bad_route() {
        let (code, _) = fail("<@hop1 user@dest>", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
    }

    #[test]
    fn test_no_domain_requires_mode() {
        let (code, built) = fail("<root>", Mode::empty());
        assert!(code > 0);
        assert_eq!(built, 0);

        let list = parse("<root>", Mode::ADDR_SPEC_NO_DOMAIN);
        assert_eq!(list[0].locpar(), "root");
        assert_eq!(list[0].domain(), "");
        assert!(list[0].flags().state.contains(State::ADDR_SPEC_NO_DOMAIN));

        let list = parse("root", Mode::ADDR_SPEC_NO_DOMAIN);
        assert_eq!(list[0].addr_spec(), "root");
    }

    #[test]
    fn test_empty_angle_address() {
        let (code, _) = fail("<>", Mode::ADDR_SPEC_NO_DOMAIN);
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
    }

    #[test]
    fn test_group_members() {
        let list = parse("Friends: a@b, c@d, e@f;", Mode::empty());
        assert_eq!(list.len(), 3);
        let states: Vec<State> = list.iter().map(|a| a.flags().state).collect();
        assert_eq!(states[0], State::GROUP | State::GROUP_START);
        assert_eq!(states[1], State::GROUP);
        assert_eq!(states[2], State::GROUP | State::GROUP_END);
        assert_eq!(list[0].group_display_name(), "Friends");
        assert_eq!(list[1].group_display_name(), "");
        assert_eq!(list[2].group_display_name(), "");
    }

    #[test]
    fn test_single_member_group() {
        let list = parse("Solo: a@b;", Mode::empty());
        assert_eq!(
            list[0].flags().state,
            State::GROUP | State::GROUP_START | State::GROUP_END
        );
    }

    #[test]
    fn test_group_with_trailing_empty_element() {
        let list = parse("G: a@b, ;", Mode::empty());
        assert_eq!(list.len(), 1);
        assert!(list[0].flags().state.contains(State::GROUP_END));
    }

    #[test]
    fn test_group_then_mailbox() {
        let list = parse("G: a@b; c@d, H:;", Mode::empty());
        assert_eq!(list.len(), 3);
        assert!(list[0].flags().state.contains(State::GROUP_END));
        assert!(!list[1].flags().state.contains(State::GROUP));
        assert!(list[2].is_empty_group());
        assert_eq!(list[2].group_display_name(), "H");
    }

    #[test]
    fn test_empty_group() {
        let list = parse("Undisclosed-recipients:;", Mode::empty());
        assert_eq!(list.len(), 1);
        let state = list[0].flags().state;
        assert!(state.contains(State::GROUP_EMPTY | State::GROUP_START | State::GROUP_END));
        assert_eq!(list[0].group_display_name(), "Undisclosed-recipients");
        assert_eq!(list[0].locpar(), "");
        assert_eq!(list[0].domain(), "");
    }

    #[test]
    fn test_groups_do_not_nest() {
        let (code, _) = fail("Outer: Inner: a@b;;", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
    }

    #[test]
    fn test_relax_nested_group_stays_in_outer() {
        let list = parse("Outer: Inner: a@b;", Mode::RELAX);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].group_display_name(), "Outer");
        assert_eq!(list[0].display_name(), "");
        assert_eq!(list[0].addr_spec(), "a@b");
        let flags = list[0].flags();
        assert!(flags
            .state
            .contains(State::GROUP | State::GROUP_START | State::GROUP_END));
        assert!(flags.faults.contains(Faults::CONTENT | Faults::RELAX));
    }

    #[test]
    fn test_unnamed_group() {
        let (code, _) = fail(": a@b;", Mode::empty());
        assert!(code & Faults::GROUP_DISPLAY_NAME_EMPTY.bits() as i32 != 0);

        let list = parse(":;", Mode::RELAX);
        assert_eq!(list.len(), 1);
        assert!(list[0].is_empty_group());
        let faults = list[0].flags().faults;
        assert!(faults.contains(Faults::GROUP_DISPLAY_NAME_EMPTY | Faults::RELAX));
    }

    #[test]
    fn test_unterminated_group() {
        let (code, built) = fail("Friends: a@b, c@d", Mode::empty());
        assert!(code & Faults::GROUP_OPEN.bits() as i32 != 0);
        assert_eq!(built, 1);

        let list = parse("Friends: a@b, c@d", Mode::RELAX);
        assert_eq!(list.len(), 2);
        assert!(list[1].flags().state.contains(State::GROUP_END | State::RELAXED));
        assert!(list[1].flags().faults.contains(Faults::GROUP_OPEN));
    }

    #[test]
    fn test_missing_separator() {
        let (code, built) = fail("a@b c@d", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
        assert_eq!(built, 0);
    }

    #[test]
    fn test_partial_success_keeps_prior_records() {
        let mut bag = Bag::new();
        let err = parse_addr_header("a@b, c@d, <broken", Mode::empty(), &mut bag).unwrap_err();
        let ImfError::Syntax { partial, .. } = err else {
            panic!("expected a syntax error");
        };
        let built: Vec<String> = partial.records(&bag).map(Address::addr_spec).collect();
        assert_eq!(built, ["a@b", "c@d"]);
    }

    #[test]
    fn test_empty_list_elements_are_skipped() {
        let list = parse(", a@b,, ,c@d,", Mode::empty());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_only_commas_is_content_error() {
        let (code, _) = fail(" , , ", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);
    }

    #[test]
    fn test_stop_early() {
        let mut bag = Bag::new();
        let parsed = parse_addr_header("a@b, c@d, e@f", Mode::STOP_EARLY, &mut bag).unwrap();
        assert_eq!(parsed.len, 1);
        assert!(parsed.stopped_at < "a@b, c@d, e@f".len());

        let list = parse("Nobody:;, x@y", Mode::STOP_EARLY);
        assert_eq!(list.len(), 1);
        assert!(list[0].is_empty_group());
    }

    #[test]
    fn test_relax_unterminated_angle() {
        let (code, built) = fail("<a@", Mode::empty());
        assert!(code > 0);
        assert_eq!(built, 0);

        let list = parse("<a@", Mode::RELAX);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].locpar(), "a");
        assert!(list[0].flags().faults.contains(Faults::RELAX | Faults::CONTENT));
    }

    #[test]
    fn test_relax_eight_bit_display_name() {
        let (code, _) = fail("Jos\u{e9} <jose@example.com>", Mode::empty());
        assert!(code & Faults::CONTENT.bits() as i32 != 0);

        let list = parse("Jos\u{e9} <jose@example.com>", Mode::RELAX);
        assert_eq!(list[0].display_name(), "Jos\u{e9}");
    }
}
