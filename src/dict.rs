//! Inline string dictionaries.
//!
//! A container carries two zlib-compressed dictionaries in its header
//! area: identities (committer and author strings prefixed by a signed
//! timezone) and paths (filenames prefixed by a file mode). Every entry
//! is two big-endian prefix bytes followed by a NUL-terminated string;
//! entries are addressed by index through a table of byte offsets into
//! the inflated data.

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};
use culpa::{throw, throws};

use crate::cursor::Cursor;
use crate::pack::{DecodeError, PackSource};
use crate::{varint, zlib};

type Error = DecodeError;

/// Prefix bytes stored before each entry string.
const PREFIX_LEN: usize = 2;

/// One loaded dictionary: the inflated data plus an offset per entry.
pub struct Dict {
    data: Vec<u8>,
    entries: Vec<u32>,
}

/// A single dictionary entry, split into the decoded two-byte prefix and
/// the string without its terminating NUL.
///
/// The prefix is a big-endian file mode for path entries and a big-endian
/// two's-complement timezone (cast to `i16`) for identity entries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DictEntry<'a> {
    pub prefix: u16,
    pub name: &'a [u8],
}

impl Dict {
    /// Loads one inline dictionary starting at `offset`: a varint size
    /// followed by the zlib blob. Returns the dictionary together with
    /// the offset of the first byte after the blob.
    #[throws]
    pub fn load<S: PackSource>(source: &S, offset: u64) -> (Dict, u64) {
        let mut cur = Cursor::new(source, offset);
        cur.remap()?;
        let size = varint::decode(&mut cur)?;
        if size < 3 || size > u64::from(u32::max_value()) {
            throw!(Error::BadDictSize(size));
        }

        let mut data = vec![0u8; size as usize];
        zlib::inflate_exact(&mut cur, &mut data)?;

        let entries = index_entries(&data)?;
        (Dict { data, entries }, cur.offset())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up entry `index`, splitting its prefix from its string.
    pub fn entry(&self, index: u64) -> Option<DictEntry<'_>> {
        let index = usize::try_from(index).ok()?;
        let start = *self.entries.get(index)? as usize;
        let raw = &self.data[start..];
        let name_len = memchr::memchr(0, &raw[PREFIX_LEN..])?;
        Some(DictEntry {
            prefix: BigEndian::read_u16(&raw[..PREFIX_LEN]),
            name: &raw[PREFIX_LEN..PREFIX_LEN + name_len],
        })
    }
}

/// Walks the inflated data twice: once to count entries, once to record
/// where each starts. Both walks must consume the buffer exactly.
#[throws]
fn index_entries(data: &[u8]) -> Vec<u32> {
    let mut count = 0;
    let mut pos = 0;
    while pos < data.len() {
        pos = next_entry(data, pos)?;
        count += 1;
    }

    let mut entries = Vec::with_capacity(count);
    let mut pos = 0;
    for _ in 0..count {
        entries.push(pos as u32);
        pos = next_entry(data, pos)?;
    }
    entries
}

/// Advances past the entry at `pos`: two prefix bytes, the string, its
/// NUL.
#[throws]
fn next_entry(data: &[u8], pos: usize) -> usize {
    let rest = data.get(pos + PREFIX_LEN..).ok_or(Error::BadDict)?;
    let nul = memchr::memchr(0, rest).ok_or(Error::BadDict)?;
    pos + PREFIX_LEN + nul + 1
}
