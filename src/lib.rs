#![forbid(unsafe_code)]

pub mod cursor;
pub mod dict;
pub mod pack;
pub mod varint;

mod commit;
mod tree;
mod zlib;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::cursor::Cursor;
pub use crate::dict::{Dict, DictEntry};
pub use crate::pack::{DecodeError, MemorySource, Pack, PackSource};

/// Number of bytes in an object fingerprint.
pub const FINGERPRINT_SIZE: usize = 20;

/// A 20-byte content hash identifying one object in a pack.
pub type Fingerprint = [u8; FINGERPRINT_SIZE];

/// Byte length of the fixed container header (magic, format revision,
/// object count). The fingerprint table starts right after it.
pub const HEADER_SIZE: u64 = 12;

/// Type nibble carried by the packed header of a structured commit.
pub const COMMIT_TYPE_TAG: u8 = 8;

/// Type nibble carried by the packed header of a structured tree.
pub const TREE_TYPE_TAG: u8 = 9;
