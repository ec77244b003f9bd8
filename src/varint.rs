//! The self-delimiting integer encoding used throughout the container.
//!
//! Each byte carries 7 payload bits and the high bit marks continuation.
//! Unlike plain LEB128 the scheme is offset-binary: after every byte the
//! accumulator is incremented before the next 7 bits are shifted in, so
//! encodings of different lengths cover disjoint ranges and each value
//! has exactly one encoding.

use culpa::throws;

use crate::cursor::Cursor;
use crate::pack::{DecodeError, PackSource};

type Error = DecodeError;

/// Decodes one varint, leaving the cursor just past its last byte.
#[throws]
pub fn decode<S: PackSource>(cur: &mut Cursor<'_, S>) -> u64 {
    let mut byte = cur.read_u8()?;
    let mut value = u64::from(byte & 0x7f);
    while byte & 0x80 != 0 {
        byte = cur.read_u8()?;
        value = value
            .checked_add(1)
            .and_then(|v| v.checked_mul(128))
            .and_then(|v| v.checked_add(u64::from(byte & 0x7f)))
            .ok_or(Error::VarintOverflow)?;
    }
    value
}

/// Encodes `value`, appending its bytes to `out`. Exact inverse of
/// [`decode`].
pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; 10];
    let mut pos = buf.len() - 1;
    buf[pos] = (value & 0x7f) as u8;
    loop {
        value >>= 7;
        if value == 0 {
            break;
        }
        value -= 1;
        pos -= 1;
        buf[pos] = 0x80 | (value & 0x7f) as u8;
    }
    out.extend_from_slice(&buf[pos..]);
}
