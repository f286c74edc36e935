//! `imfshell`: RFC 5322 header-field parsing for terminal mail tools.
//!
//! This crate turns raw header-field bodies into flat, immutable records:
//! address lists (with groups, comments, domain literals and the obsolete
//! forms of RFC 5322 §4.4) and token lists for other structured bodies.
//! Every record lives in a caller-owned memory bag, one allocation per
//! parsed entity.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;

pub use error::{ImfError, Result};
pub use model::address::Address;
pub use model::token::Token;
pub use parser::flags::{Faults, Flags, Mode, State};
pub use parser::{parse_addr_header, parse_struct_header, Parsed, Parser};
pub use store::bag::Bag;
