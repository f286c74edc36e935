//! Centralized error types for imfshell.

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::flags::Flags;
use crate::parser::Parsed;

/// Result code: the header body is empty or whitespace only.
pub const CODE_EMPTY: i32 = -1;
/// Result code: the header body reaches the input ceiling.
pub const CODE_OVERFLOW: i32 = -2;
/// Result code: the memory bag refused an allocation.
pub const CODE_NO_MEMORY: i32 = -3;
/// Result code: reading the input failed (shell only, never the parser).
pub const CODE_IO: i32 = -4;

/// All errors produced by the imfshell library.
#[derive(Error, Debug)]
pub enum ImfError {
    /// Nothing but whitespace before the end of input.
    #[error("Header body is empty")]
    Empty,

    /// The input is at or above the length ceiling. Nothing was allocated.
    #[error("Header body of {len} bytes reaches the {limit} byte ceiling")]
    Overflow { len: usize, limit: usize },

    /// The memory bag could not hold the next record.
    ///
    /// `partial` lists the records built before the refusal.
    #[error("Memory bag exhausted: {requested} bytes requested")]
    NoMemory { requested: usize, partial: Parsed },

    /// A syntax error outside relax mode.
    ///
    /// `flags` holds every state and error bit accumulated up to the error;
    /// `partial` lists the records built before it.
    #[error("Syntax error at offset {}: {flags}", .partial.stopped_at)]
    Syntax { flags: Flags, partial: Parsed },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, ImfError>`.
pub type Result<T> = std::result::Result<T, ImfError>;

impl ImfError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Signed result code: negative for call-level failures, the bitwise OR
    /// of state and error bits for syntax errors.
    pub fn code(&self) -> i32 {
        match self {
            Self::Empty => CODE_EMPTY,
            Self::Overflow { .. } => CODE_OVERFLOW,
            Self::NoMemory { .. } => CODE_NO_MEMORY,
            Self::Io { .. } => CODE_IO,
            Self::Syntax { flags, .. } => i32::try_from(flags.bits()).unwrap_or(i32::MAX),
        }
    }

    /// Records fully built before the failure, if the call got that far.
    pub fn partial(&self) -> Option<&Parsed> {
        match self {
            Self::NoMemory { partial, .. } | Self::Syntax { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
