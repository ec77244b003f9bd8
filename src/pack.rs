//! Pack handles, injected pack access and reference resolution.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::io;

use byteorder::{BigEndian, ByteOrder};
use culpa::{throw, throws};
use once_cell::unsync::OnceCell;
use thiserror::Error;

use crate::cursor::Cursor;
use crate::dict::{Dict, DictEntry};
use crate::varint;
use crate::{Fingerprint, FINGERPRINT_SIZE, HEADER_SIZE};

/// Errors when decoding pack contents.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("pack data ended prematurely. either the pack is truncated or an offset points at garbage")]
    UnexpectedEnd,
    #[error("varint does not fit in 64 bits")]
    VarintOverflow,
    #[error("the pack window could not be mapped")]
    Io(#[from] io::Error),
    #[error("fingerprint reference {0} is outside the pack's object table")]
    BadFingerprintIndex(u64),
    #[error("dictionary reference {0} is out of range")]
    BadDictIndex(u64),
    #[error("dictionary declares an impossible size of {0} bytes")]
    BadDictSize(u64),
    #[error("dictionary contents are malformed")]
    BadDict,
    #[error("zlib stream is corrupt")]
    Zlib(#[from] flate2::DecompressError),
    #[error("zlib stream did not inflate to the expected length")]
    InflateSizeMismatch,
    #[error("copy source is not a tree (type {0})")]
    NotATree(u8),
    #[error("invalid tree copy directive")]
    BadCopy,
    #[error("tree copies nested too deeply")]
    CopyDepthExceeded,
    #[error("object does not fit its declared size")]
    OutputOverflow,
    #[error("object is smaller than its declared size")]
    OutputIncomplete,
}
type Error = DecodeError; // do it this way for better docs

/// Raw pack access injected by the embedder.
///
/// The decoder only ever borrows through this trait: windows,
/// fingerprints and offsets all live in the source and nothing is
/// retained once a decode call returns.
pub trait PackSource {
    /// Number of objects in the pack.
    fn num_objects(&self) -> u32;

    /// Row `index` of the fingerprint table, `None` when out of range.
    fn fingerprint(&self, index: u32) -> Option<&Fingerprint>;

    /// Maps pack bytes starting at `offset`: at least one byte, as many
    /// as are contiguously available.
    fn window(&self, offset: u64) -> io::Result<&[u8]>;

    /// Offset of the object with the given fingerprint, if the pack
    /// index knows it.
    fn offset_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<u64>;

    /// Offset of the `index`-th object in table order.
    fn nth_object_offset(&self, index: u32) -> Option<u64>;
}

/// Magic bytes opening every container.
pub const MAGIC: [u8; 4] = *b"PACK";

/// The container format revision this crate decodes.
pub const VERSION: u32 = 4;

/// A pack held entirely in memory.
///
/// This is the reference [`PackSource`]: the whole container image is one
/// buffer, so every window simply runs to the end of it. The object
/// index a production embedder would derive from a separate index file
/// is registered explicitly through
/// [`index_object`](MemorySource::index_object).
pub struct MemorySource {
    data: Vec<u8>,
    num_objects: u32,
    by_fingerprint: HashMap<Fingerprint, u64>,
    by_position: Vec<u64>,
}

impl MemorySource {
    /// Wraps a complete container image, validating the fixed header and
    /// the presence of the fingerprint table.
    #[throws(io::Error)]
    pub fn from_bytes(data: Vec<u8>) -> MemorySource {
        let bad = |msg| io::Error::new(io::ErrorKind::InvalidData, msg);
        if data.len() < HEADER_SIZE as usize {
            throw!(bad("container shorter than its fixed header"));
        }
        if data[..4] != MAGIC {
            throw!(bad("bad container magic"));
        }
        let version = BigEndian::read_u32(&data[4..8]);
        if version != VERSION {
            throw!(bad("unsupported container revision"));
        }
        let num_objects = BigEndian::read_u32(&data[8..12]);
        let table_end =
            HEADER_SIZE + u64::from(num_objects) * FINGERPRINT_SIZE as u64;
        if (data.len() as u64) < table_end {
            throw!(bad("container truncated inside the fingerprint table"));
        }
        MemorySource {
            data,
            num_objects,
            by_fingerprint: HashMap::new(),
            by_position: Vec::new(),
        }
    }

    /// Registers the offset of the next object, in table order, for the
    /// two index lookups.
    pub fn index_object(&mut self, fingerprint: Fingerprint, offset: u64) {
        self.by_fingerprint.insert(fingerprint, offset);
        self.by_position.push(offset);
    }
}

impl PackSource for MemorySource {
    fn num_objects(&self) -> u32 {
        self.num_objects
    }

    fn fingerprint(&self, index: u32) -> Option<&Fingerprint> {
        if index >= self.num_objects {
            return None;
        }
        let start = HEADER_SIZE as usize + index as usize * FINGERPRINT_SIZE;
        let row = self.data.get(start..start + FINGERPRINT_SIZE)?;
        <&Fingerprint>::try_from(row).ok()
    }

    fn window(&self, offset: u64) -> io::Result<&[u8]> {
        usize::try_from(offset)
            .ok()
            .and_then(|start| self.data.get(start..))
            .filter(|win| !win.is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "offset past the end of the pack",
                )
            })
    }

    fn offset_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<u64> {
        self.by_fingerprint.get(fingerprint).copied()
    }

    fn nth_object_offset(&self, index: u32) -> Option<u64> {
        self.by_position.get(index as usize).copied()
    }
}

/// A container handle: the injected source plus the two string
/// dictionaries, loaded lazily on first use.
///
/// The dictionary cells are written once and are not synchronized. To
/// share one `Pack` across threads, call
/// [`preload_dictionaries`](Pack::preload_dictionaries) before fanning
/// out.
pub struct Pack<S> {
    source: S,
    idents: OnceCell<(Dict, u64)>,
    paths: OnceCell<Dict>,
}

impl<S: PackSource> Pack<S> {
    pub fn new(source: S) -> Pack<S> {
        Pack {
            source,
            idents: OnceCell::new(),
            paths: OnceCell::new(),
        }
    }

    /// The injected source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Identity dictionary plus the offset at which its blob ends. It
    /// sits right behind the fingerprint table.
    #[throws]
    fn idents(&self) -> &(Dict, u64) {
        self.idents.get_or_try_init(|| {
            let offset = HEADER_SIZE
                + u64::from(self.source.num_objects()) * FINGERPRINT_SIZE as u64;
            Dict::load(&self.source, offset)
        })?
    }

    /// Path dictionary. Loading it forces the identity dictionary first:
    /// only that load reveals where the identity blob ends and the path
    /// blob starts.
    #[throws]
    fn paths(&self) -> &Dict {
        self.paths.get_or_try_init(|| {
            let &(_, end) = self.idents()?;
            Dict::load(&self.source, end).map(|(dict, _)| dict)
        })?
    }

    /// Loads both dictionaries now instead of on first use. A pack whose
    /// dictionaries fail to load cannot decode structured objects and
    /// should be discarded.
    #[throws]
    pub fn preload_dictionaries(&self) {
        self.paths()?;
    }

    /// Resolves a fingerprint reference at the cursor: a zero byte
    /// followed by 20 inline bytes, or a 1-based varint index into the
    /// object table.
    #[throws]
    pub fn fingerprint_ref(&self, cur: &mut Cursor<'_, S>) -> Fingerprint {
        if cur.peek_u8()? == 0 {
            let bytes = cur.read_bytes(1 + FINGERPRINT_SIZE)?;
            let mut fp = Fingerprint::default();
            fp.copy_from_slice(&bytes[1..]);
            fp
        } else {
            let index = varint::decode(cur)?;
            let row = index
                .checked_sub(1)
                .and_then(|row| u32::try_from(row).ok())
                .and_then(|row| self.source.fingerprint(row))
                .ok_or(Error::BadFingerprintIndex(index))?;
            *row
        }
    }

    /// Resolves an identity reference: a varint index into the identity
    /// dictionary. The entry prefix is the big-endian signed timezone.
    #[throws]
    pub fn ident_ref(&self, cur: &mut Cursor<'_, S>) -> DictEntry<'_> {
        let (dict, _) = self.idents()?;
        let index = varint::decode(cur)?;
        dict.entry(index).ok_or(Error::BadDictIndex(index))?
    }

    /// Resolves a path reference by index. The entry prefix is the
    /// big-endian file mode.
    #[throws]
    pub fn path_ref(&self, index: u64) -> DictEntry<'_> {
        self.paths()?.entry(index).ok_or(Error::BadDictIndex(index))?
    }
}
