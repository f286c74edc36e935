//! RFC 5234 / RFC 5322 character classes.
//!
//! One `const` lookup table maps every byte to the set of classes it belongs
//! to. Bytes `>= 0x80` belong to none of them; the parsers reject raw 8-bit
//! data unless relaxed.

pub const ALPHA: u16 = 1 << 0;
pub const DIGIT: u16 = 1 << 1;
pub const VCHAR: u16 = 1 << 2;
pub const ATEXT: u16 = 1 << 3;
pub const CTEXT: u16 = 1 << 4;
pub const DTEXT: u16 = 1 << 5;
pub const QTEXT: u16 = 1 << 6;
pub const SPECIAL: u16 = 1 << 7;
pub const OBS_NO_WS_CTL: u16 = 1 << 8;
pub const CR: u16 = 1 << 9;
pub const LF: u16 = 1 << 10;
pub const SP: u16 = 1 << 11;
pub const HT: u16 = 1 << 12;
pub const DQUOTE: u16 = 1 << 13;

const fn classify(b: u8) -> u16 {
    let mut c = 0;
    if b.is_ascii_alphabetic() {
        c |= ALPHA;
    }
    if b.is_ascii_digit() {
        c |= DIGIT;
    }
    if b >= 0x21 && b <= 0x7E {
        c |= VCHAR;
        match b {
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b':' | b';' | b'@' | b'\\' | b','
            | b'.' | b'"' => c |= SPECIAL,
            _ => c |= ATEXT,
        }
        // ctext: %d33-39 / %d42-91 / %d93-126
        if !matches!(b, b'(' | b')' | b'\\') {
            c |= CTEXT;
        }
        // dtext: %d33-90 / %d94-126
        if !matches!(b, b'[' | b']' | b'\\') {
            c |= DTEXT;
        }
        // qtext: %d33 / %d35-91 / %d93-126
        if !matches!(b, b'"' | b'\\') {
            c |= QTEXT;
        }
    }
    // obs-NO-WS-CTL: %d1-8 / %d11 / %d12 / %d14-31 / %d127
    if matches!(b, 1..=8 | 11 | 12 | 14..=31 | 127) {
        c |= OBS_NO_WS_CTL;
    }
    match b {
        b'\r' => c |= CR,
        b'\n' => c |= LF,
        b' ' => c |= SP,
        b'\t' => c |= HT,
        b'"' => c |= DQUOTE,
        _ => {}
    }
    c
}

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

static TABLE: [u16; 256] = build_table();

/// All classes of `b`.
#[inline]
pub fn class(b: u8) -> u16 {
    TABLE[usize::from(b)]
}

#[inline]
pub fn is(b: u8, classes: u16) -> bool {
    class(b) & classes != 0
}

#[inline]
pub fn is_atext(b: u8) -> bool {
    is(b, ATEXT)
}

#[inline]
pub fn is_wsp(b: u8) -> bool {
    is(b, SP | HT)
}

/// Any byte `skip_fws` moves over.
#[inline]
pub fn is_fws(b: u8) -> bool {
    is(b, SP | HT | CR | LF)
}

#[inline]
pub fn is_ctext(b: u8) -> bool {
    is(b, CTEXT | OBS_NO_WS_CTL)
}

#[inline]
pub fn is_qtext(b: u8) -> bool {
    is(b, QTEXT | OBS_NO_WS_CTL)
}

#[inline]
pub fn is_dtext(b: u8) -> bool {
    is(b, DTEXT | OBS_NO_WS_CTL)
}

/// True if `text` is a non-empty `dot-atom-text`.
pub fn is_dot_atom_text(text: &[u8]) -> bool {
    !text.is_empty()
        && text
            .split(|&b| b == b'.')
            .all(|atom| !atom.is_empty() && atom.iter().all(|&b| is_atext(b)))
}

/// True if every byte of `text` is atext.
pub fn is_atom_text(text: &[u8]) -> bool {
    !text.is_empty() && text.iter().all(|&b| is_atext(b))
}

/// True if `text` can stand as an unquoted phrase: atoms separated by
/// single spaces. 8-bit bytes are let through as they are.
pub fn is_phrase_text(text: &[u8]) -> bool {
    text.split(|&b| b == b' ')
        .all(|word| word.iter().all(|&b| is_atext(b) || b >= 0x80))
}
