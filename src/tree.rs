//! Tree decoding and the copy engine.
//!
//! A packed tree is a directive stream: literal entries referencing the
//! path dictionary, and copy directives splicing a range of entries out
//! of another tree in the same pack. Copies nest, since the referenced
//! tree may itself be built from copies, so reconstruction recurses
//! through the referenced trees with partial-range semantics: a frame
//! skips `start` logical entries, then emits `count`.

use std::cmp;
use std::io::Write;

use culpa::{throw, throws};

use crate::cursor::Cursor;
use crate::pack::{DecodeError, Pack, PackSource};
use crate::varint;
use crate::{FINGERPRINT_SIZE, TREE_TYPE_TAG};

type Error = DecodeError;

/// Upper bound on copy recursion before the decoder refuses. A
/// hand-crafted pack can make a tree copy itself; without the cap that
/// would only stop at stack exhaustion.
const MAX_COPY_DEPTH: usize = 64;

impl<S: PackSource> Pack<S> {
    /// Decodes the tree stored at `offset` into its canonical entry list
    /// of exactly `size` bytes: for each entry the octal mode, a space,
    /// the NUL-terminated name and the raw 20-byte fingerprint.
    #[throws]
    pub fn decode_tree(&self, offset: u64, size: usize) -> Vec<u8> {
        let mut cur = Cursor::new(self.source(), offset);
        cur.remap()?;
        let nb_entries = varint::decode(&mut cur)?;

        let mut out = Vec::with_capacity(size);
        self.decode_range(offset, 0, nb_entries, &mut out, size, false, 0)?;
        if out.len() != size {
            throw!(Error::OutputIncomplete);
        }
        out
    }

    /// Emits `count` entries of the tree at `offset`, starting at
    /// logical entry `start`. With `parse_header` the offset points at a
    /// whole packed object, so the variable-length object header is
    /// skipped first and its type nibble checked against the tree tag.
    #[throws]
    fn decode_range(
        &self,
        offset: u64,
        mut start: u64,
        mut count: u64,
        out: &mut Vec<u8>,
        size: usize,
        parse_header: bool,
        depth: usize,
    ) {
        if depth > MAX_COPY_DEPTH {
            throw!(Error::CopyDepthExceeded);
        }

        let mut cur = Cursor::new(self.source(), offset);
        cur.remap()?;

        if parse_header {
            loop {
                let byte = cur.read_u8()?;
                if byte & 0x80 == 0 {
                    if byte & 0xf != TREE_TYPE_TAG {
                        throw!(Error::NotATree(byte & 0xf));
                    }
                    break;
                }
            }
        }

        let nb_entries = varint::decode(&mut cur)?;
        if start > nb_entries || count > nb_entries - start {
            throw!(Error::BadCopy);
        }

        // Source offset of the most recent copy directive. Local to this
        // frame: neither recursion below nor the next top-level call
        // inherits it.
        let mut copy_source: Option<u64> = None;

        while count > 0 {
            cur.ensure(FINGERPRINT_SIZE)?;
            let what = varint::decode(&mut cur)?;

            if what & 1 == 0 {
                if start > 0 {
                    // A literal entry we were asked to skip. Step over
                    // the fingerprint reference without resolving it.
                    if cur.peek_u8()? == 0 {
                        cur.skip(1 + FINGERPRINT_SIZE)?;
                    } else {
                        while cur.read_u8()? & 0x80 != 0 {}
                    }
                    start -= 1;
                } else {
                    let path = self.path_ref(what >> 1)?;
                    let fingerprint = self.fingerprint_ref(&mut cur)?;
                    write!(out, "{:o} ", path.prefix)?;
                    out.extend_from_slice(path.name);
                    out.push(0);
                    if out.len() + FINGERPRINT_SIZE > size {
                        throw!(Error::OutputOverflow);
                    }
                    out.extend_from_slice(&fingerprint);
                    count -= 1;
                }
            } else {
                let copy_start = what >> 1;
                let copy_meta = varint::decode(&mut cur)?;
                if copy_meta == 0 {
                    throw!(Error::BadCopy);
                }

                // The low bit flags an explicit source object; without
                // it the previous directive's source is reused.
                if copy_meta & 1 != 0 {
                    copy_source = Some(self.copy_source_offset(&mut cur)?);
                }
                let copy_count = copy_meta >> 1;
                if copy_count == 0 {
                    throw!(Error::BadCopy);
                }
                let source_offset = copy_source.ok_or(Error::BadCopy)?;

                if start >= copy_count {
                    start -= copy_count;
                } else {
                    let take = cmp::min(copy_count - start, count);
                    self.decode_range(
                        source_offset,
                        copy_start + start,
                        take,
                        out,
                        size,
                        true,
                        depth + 1,
                    )?;
                    count -= take;
                    start = 0;
                    // The recursion moved the pack window; map a fresh
                    // one before the next directive.
                    cur.invalidate();
                }
            }
        }
    }

    /// Reads a copy directive's source specifier: a varint table index,
    /// or zero followed by an inline fingerprint to look up in the pack
    /// index.
    #[throws]
    fn copy_source_offset(&self, cur: &mut Cursor<'_, S>) -> u64 {
        use std::convert::TryFrom;

        let spec = varint::decode(cur)?;
        if spec == 0 {
            let mut fp = [0u8; FINGERPRINT_SIZE];
            fp.copy_from_slice(cur.read_bytes(FINGERPRINT_SIZE)?);
            self.source()
                .offset_by_fingerprint(&fp)
                .ok_or(Error::BadCopy)?
        } else {
            spec.checked_sub(1)
                .and_then(|row| u32::try_from(row).ok())
                .and_then(|row| self.source().nth_object_offset(row))
                .ok_or(Error::BadFingerprintIndex(spec))?
        }
    }
}
