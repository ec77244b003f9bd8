//! Streaming zlib inflation through a pack window cursor.

use culpa::{throw, throws};
use flate2::{Decompress, FlushDecompress, Status};

use crate::cursor::Cursor;
use crate::pack::{DecodeError, PackSource};

type Error = DecodeError;

/// Inflates one zlib stream into `out`, which must be sized to the exact
/// expected length. The cursor ends up just past the compressed bytes.
///
/// The stream has to terminate cleanly and produce exactly `out.len()`
/// bytes; short, long and non-terminating streams all fail. Once `out`
/// is full, decompression continues into a scratch byte so a trailer
/// split across window boundaries can still be consumed; any actual
/// payload byte landing there is a length mismatch.
#[throws]
pub(crate) fn inflate_exact<S: PackSource>(cur: &mut Cursor<'_, S>, out: &mut [u8]) {
    let mut stream = Decompress::new(true);
    let mut scratch = [0u8; 1];
    loop {
        if cur.remaining() == 0 {
            cur.remap()?;
        }
        let consumed_before = stream.total_in();
        let produced_before = stream.total_out();
        let dst = match out.get_mut(produced_before as usize..) {
            Some(dst) if !dst.is_empty() => dst,
            _ => &mut scratch[..],
        };
        let status = stream.decompress(cur.window(), dst, FlushDecompress::Finish)?;
        if stream.total_out() as usize > out.len() {
            throw!(Error::InflateSizeMismatch);
        }
        let consumed = (stream.total_in() - consumed_before) as usize;
        cur.skip(consumed)?;
        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if consumed == 0 && stream.total_out() == produced_before {
                    // No forward progress with input and output space on
                    // hand: the stream will never terminate.
                    throw!(Error::InflateSizeMismatch);
                }
            }
        }
    }
    if stream.total_out() as usize != out.len() {
        throw!(Error::InflateSizeMismatch);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{deflate, RawSource};

    #[test]
    fn inflates_exact_lengths() {
        let plain = b"the quick brown fox jumps over the lazy dog";
        let src = RawSource(deflate(plain));
        let mut cur = Cursor::new(&src, 0);
        let mut out = vec![0u8; plain.len()];
        inflate_exact(&mut cur, &mut out).unwrap();
        assert_eq!(out, plain);
        assert_eq!(cur.offset(), src.0.len() as u64);
    }

    #[test]
    fn short_stream_fails() {
        let src = RawSource(deflate(b"abc"));
        let mut cur = Cursor::new(&src, 0);
        let mut out = vec![0u8; 8];
        assert!(matches!(
            inflate_exact(&mut cur, &mut out),
            Err(Error::InflateSizeMismatch)
        ));
    }

    #[test]
    fn long_stream_fails() {
        let src = RawSource(deflate(b"abcdefgh"));
        let mut cur = Cursor::new(&src, 0);
        let mut out = vec![0u8; 3];
        assert!(matches!(
            inflate_exact(&mut cur, &mut out),
            Err(Error::InflateSizeMismatch)
        ));
    }

    #[test]
    fn truncated_stream_fails() {
        let mut bytes = deflate(b"some payload that compresses");
        bytes.truncate(bytes.len() / 2);
        let src = RawSource(bytes);
        let mut cur = Cursor::new(&src, 0);
        let mut out = vec![0u8; 28];
        assert!(inflate_exact(&mut cur, &mut out).is_err());
    }
}
