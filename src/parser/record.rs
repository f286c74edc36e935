//! Record builder: one bag allocation per parsed entity.
//!
//! The builder computes the exact size an entity needs (record header plus
//! every string field), asks the bag for precisely that many bytes and only
//! then copies the fields. A refused allocation links nothing.

use std::borrow::Cow;
use std::mem::size_of;

use super::chars;
use super::flags::Flags;
use super::lex::{Halt, Step};
use super::Parsed;
use crate::store::bag::{Bag, RecordId};

/// Largest size a single record may request.
pub(crate) const MAX_RECORD_SIZE: usize = i32::MAX as usize;

/// Bytes one record of type `T` with these fields occupies.
pub(crate) fn required_size<T>(fields: &[Cow<'_, str>]) -> usize {
    fields
        .iter()
        .fold(size_of::<T>(), |acc, f| acc.saturating_add(f.len()))
}

/// Allocate and fill one record.
///
/// Bytes that are not valid UTF-8 (only reachable in relax mode) are
/// replaced before sizing, so the size requested always matches the stored
/// text exactly.
pub(crate) fn build<T, const N: usize>(
    bag: &mut Bag<T>,
    fields: [&[u8]; N],
    flags: Flags,
    make: fn(Box<str>, [usize; N], Flags) -> T,
) -> Step<RecordId> {
    let fields = fields.map(String::from_utf8_lossy);
    let size = required_size::<T>(&fields);
    if size > MAX_RECORD_SIZE {
        return Err(Halt::NoMemory(size));
    }
    bag.alloc(size, || {
        let mut text = String::with_capacity(size - size_of::<T>());
        let mut ends = [0; N];
        for (end, field) in ends.iter_mut().zip(&fields) {
            text.push_str(field);
            *end = text.len();
        }
        make(text.into_boxed_str(), ends, flags)
    })
    .map_err(|e| Halt::NoMemory(e.requested))
}

/// Wrap `text` in one pair of quotes, escaping `"` and `\`.
pub(crate) fn quote(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'"');
    for &b in text {
        if b == b'"' || b == b'\\' {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b'"');
    out
}

/// A display-name as stored: bare when it reads as a run of atoms, one
/// pair of quotes otherwise.
pub(crate) fn phrase(text: Vec<u8>) -> Vec<u8> {
    if chars::is_phrase_text(&text) {
        text
    } else {
        quote(&text)
    }
}

/// Head, length and accumulated bits of the list being produced.
#[derive(Debug, Default)]
pub(crate) struct ListBuilder {
    head: Option<RecordId>,
    len: usize,
    flags: Flags,
}

impl ListBuilder {
    pub(crate) fn link(&mut self, id: RecordId, flags: Flags) {
        self.head.get_or_insert(id);
        self.len += 1;
        self.flags = self.flags.union(flags);
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn flags(&self) -> Flags {
        self.flags
    }

    pub(crate) fn finish(&self, stopped_at: usize) -> Parsed {
        Parsed {
            head: self.head,
            len: self.len,
            flags: self.flags,
            stopped_at,
        }
    }
}
