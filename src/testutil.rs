//! Shared fixtures for the unit tests.

use std::convert::TryFrom;
use std::io;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::pack::{PackSource, MAGIC, VERSION};
use crate::Fingerprint;

/// Headerless source: the byte buffer is the whole mappable range and
/// there is no object table. Good enough for cursor, varint, zlib and
/// dictionary tests.
pub struct RawSource(pub Vec<u8>);

impl PackSource for RawSource {
    fn num_objects(&self) -> u32 {
        0
    }

    fn fingerprint(&self, _index: u32) -> Option<&Fingerprint> {
        None
    }

    fn window(&self, offset: u64) -> io::Result<&[u8]> {
        usize::try_from(offset)
            .ok()
            .and_then(|start| self.0.get(start..))
            .filter(|win| !win.is_empty())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "past end of pack")
            })
    }

    fn offset_by_fingerprint(&self, _fingerprint: &Fingerprint) -> Option<u64> {
        None
    }

    fn nth_object_offset(&self, _index: u32) -> Option<u64> {
        None
    }
}

/// A container image holding just the fixed header and the given
/// fingerprint table.
pub fn container(fingerprints: &[Fingerprint]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&MAGIC);
    data.extend_from_slice(&VERSION.to_be_bytes());
    data.extend_from_slice(&(fingerprints.len() as u32).to_be_bytes());
    for fp in fingerprints {
        data.extend_from_slice(fp);
    }
    data
}

/// One whole zlib stream over `data`.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}
