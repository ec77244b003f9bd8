//! Commit decoding.
//!
//! A packed commit is a dense header (tree reference, parent
//! references, times, identity references) followed by the
//! zlib-compressed free-form message. Decoding re-emits the canonical
//! text: `tree` and `parent` lines, the `author` and `committer` lines
//! with their reconstructed timestamps, then the inflated message.

use std::io::Write;

use culpa::{throw, throws};

use crate::cursor::Cursor;
use crate::pack::{DecodeError, Pack, PackSource};
use crate::{varint, zlib};

type Error = DecodeError;

impl<S: PackSource> Pack<S> {
    /// Decodes the commit stored at `offset` into its canonical text of
    /// exactly `size` bytes.
    #[throws]
    pub fn decode_commit(&self, offset: u64, size: usize) -> Vec<u8> {
        let mut cur = Cursor::new(self.source(), offset);
        cur.remap()?;

        let mut out = Vec::with_capacity(size);

        let tree = self.fingerprint_ref(&mut cur)?;
        writeln!(out, "tree {}", hex::encode(tree))?;
        reserve(&out, size)?;

        let nb_parents = varint::decode(&mut cur)?;
        for _ in 0..nb_parents {
            let parent = self.fingerprint_ref(&mut cur)?;
            writeln!(out, "parent {}", hex::encode(parent))?;
            reserve(&out, size)?;
        }

        let commit_time = varint::decode(&mut cur)?;
        let committer = self.ident_ref(&mut cur)?;
        let author_delta = varint::decode(&mut cur)?;
        let author = self.ident_ref(&mut cur)?;

        // The author time is stored relative to the commit time, with
        // the direction in the low bit.
        let author_time = if author_delta & 1 != 0 {
            commit_time.wrapping_add(author_delta >> 1)
        } else {
            commit_time.wrapping_sub(author_delta >> 1)
        };

        out.write_all(b"author ")?;
        out.write_all(author.name)?;
        writeln!(out, " {} {:+05}", author_time, author.prefix as i16)?;
        reserve(&out, size)?;

        out.write_all(b"committer ")?;
        out.write_all(committer.name)?;
        writeln!(out, " {} {:+05}", commit_time, committer.prefix as i16)?;
        reserve(&out, size)?;

        // The message fills the rest of the buffer exactly.
        let header_len = out.len();
        out.resize(size, 0);
        zlib::inflate_exact(&mut cur, &mut out[header_len..])?;
        out
    }
}

/// Every header emission must leave room for what follows it.
#[throws]
fn reserve(out: &[u8], size: usize) {
    if out.len() >= size {
        throw!(Error::OutputOverflow);
    }
}
