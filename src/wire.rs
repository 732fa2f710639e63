//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Low-level definitions for working with the wire format.
//!
//! External code generally should not use things from this module; instead,
//! prefer the `writer` and `reader` modules, which handle framing for you.
//!
//! The integer encoding is EBML-style: a varint's first byte carries a unary
//! length prefix (a single 1 bit at position `8 - len`), and the value bits
//! fill the remainder of the first byte plus all following bytes, big-endian.
//! Element IDs and content lengths both use this scheme; content lengths
//! additionally avoid the all-ones "unknown length" pattern by padding values
//! adjacent to a tier boundary up to the next width.

use crate::error::{Error, Result};

/// The maximum number of bytes a varint may occupy.
pub const MAX_WIDTH: usize = 8;

/// The raw ID of the reserved document header node.
pub const DOC_MAGIC: u64 = 0x1A45_DFA3;
/// Header child: format version of the document.
pub const ID_VERSION: u64 = 0x4286;
/// Header child: minimum reader version able to decode the document.
pub const ID_READER_VERSION: u64 = 0x42F7;
/// Header child: byte width of every hashed field ID in the document.
pub const ID_MAX_ID_LEN: u64 = 0x42F2;
/// Header child: maximum byte width of a content length.
pub const ID_MAX_SIZE_LEN: u64 = 0x42F3;
/// Header child: content-type literal identifying the document family.
pub const ID_CONTENT_TYPE: u64 = 0x4282;
/// The raw ID shared by every element of a serialised sequence.
pub const SEQUENCE_MARKER: u64 = 0x81;

/// The content-type literal written into (and required of) every document.
pub const CONTENT_TYPE: &str = "ebml-serializer";
/// The format and reader version this library produces and understands.
pub const FORMAT_VERSION: u64 = 1;
/// The maximum content-length byte width, as declared in the header.
pub const MAX_SIZE_LEN: u64 = 8;
/// The hashed-ID byte width used when none is requested explicitly.
pub const DEFAULT_ID_LEN: usize = 4;

fn check_width(len: usize) -> Result<()> {
    if len < 1 || len > MAX_WIDTH {
        Err(Error::IdLenOutOfRange(len))
    } else {
        Ok(())
    }
}

/// The number of bytes needed to hold `value`'s significant bits in a
/// varint, before any explicit minimum width is applied.
fn varint_width(value: u64) -> Result<usize> {
    for n in 1..MAX_WIDTH {
        if value >> (7 * n) == 0 {
            return Ok(n);
        }
    }
    if value >> 56 == 0 {
        Ok(MAX_WIDTH)
    } else {
        Err(Error::VarintOverflow(value))
    }
}

/// The number of bytes a content length of `value` occupies.
///
/// Values within one unit of a tier boundary are pushed up a tier so the
/// all-ones reserved pattern is never produced.
fn varlen_width(value: u64) -> Result<usize> {
    for n in 1..MAX_WIDTH {
        if value < (1u64 << (7 * n)) - 2 {
            return Ok(n);
        }
    }
    if value < (1u64 << 56) - 1 {
        Ok(MAX_WIDTH)
    } else {
        Err(Error::VarintOverflow(value))
    }
}

/// Appends `value` as an `n`-byte varint. `value` must fit in `7 * n` bits.
fn put_prefixed(out: &mut Vec<u8>, value: u64, n: usize) {
    let bytes = value.to_be_bytes();
    let start = out.len();
    out.extend_from_slice(&bytes[MAX_WIDTH - n..]);
    out[start] |= 0x80 >> (n - 1);
}

/// Appends `value` to `out` as a varint of at least `min_bytes` bytes.
///
/// Fails if `min_bytes` is outside 1..=8 or `value` has more than 56
/// significant bits.
pub fn put_varint(out: &mut Vec<u8>, value: u64, min_bytes: usize) -> Result<()> {
    check_width(min_bytes)?;
    let n = varint_width(value)?.max(min_bytes);
    put_prefixed(out, value, n);
    Ok(())
}

/// Appends `value` to `out` as a content length.
pub fn put_varlen(out: &mut Vec<u8>, value: u64) -> Result<()> {
    let n = varlen_width(value)?;
    put_prefixed(out, value, n);
    Ok(())
}

/// The byte length of the varint starting with `first`, or an error for the
/// invalid `0x00` leading byte.
fn prefix_width(first: u8) -> Result<usize> {
    if first == 0 {
        Err(Error::InvalidVarint)
    } else {
        Ok(first.leading_zeros() as usize + 1)
    }
}

/// Decodes one varint from the front of `input`.
///
/// Returns the value with its length-prefix bits masked out, and the number
/// of bytes consumed. Used for both element IDs and content lengths; the
/// caller is responsible for interpreting the value.
pub fn take_varint(input: &[u8]) -> Result<(u64, usize)> {
    let first = *input.first().ok_or(Error::TruncatedVarint)?;
    let n = prefix_width(first)?;
    if input.len() < n {
        return Err(Error::TruncatedVarint);
    }

    // Mask out the length prefix; for n = 8 no value bits remain in byte 0.
    let mask = ((1u32 << (8 - n)) - 1) as u8;
    let mut value = (first & mask) as u64;
    for &b in &input[1..n] {
        value = value << 8 | b as u64;
    }
    Ok((value, n))
}

/// One element ID, held as its encoded bytes.
///
/// IDs are compared byte-wise, never by decoded value: a hashed ID padded to
/// the document's `auto_id_len` and a shorter literal ID are distinct even
/// when they would decode to the same number.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ElementId {
    len: u8,
    buf: [u8; MAX_WIDTH],
}

impl ElementId {
    /// Builds an ID from a reserved literal.
    ///
    /// The literal's significant bytes are taken verbatim as the encoded
    /// form, so `0x1A45DFA3` becomes the four bytes `1A 45 DF A3` and the
    /// sequence marker `0x81` a single byte. Literals must already carry a
    /// valid length prefix in their top byte.
    pub fn from_literal(id: u64) -> Self {
        let mut n = MAX_WIDTH;
        while n > 1 && id >> (8 * (n - 1)) == 0 {
            n -= 1;
        }
        let mut buf = [0u8; MAX_WIDTH];
        buf[..n].copy_from_slice(&id.to_be_bytes()[MAX_WIDTH - n..]);
        ElementId { len: n as u8, buf }
    }

    /// Derives the ID for a named field.
    ///
    /// The name is hashed with 64-bit FNV-1a, masked to `7 * auto_id_len`
    /// bits, and encoded as a varint padded to exactly `auto_id_len` bytes.
    /// Distinct names may collide; this is an accepted limitation of the
    /// format, not something callers can detect from the document alone.
    pub fn from_name(name: &str, auto_id_len: usize) -> Result<Self> {
        check_width(auto_id_len)?;
        let mask = (1u64 << (7 * auto_id_len)) - 1;
        let hash = fnv1a(name.as_bytes()) & mask;

        let mut buf = [0u8; MAX_WIDTH];
        buf[..auto_id_len]
            .copy_from_slice(&hash.to_be_bytes()[MAX_WIDTH - auto_id_len..]);
        buf[0] |= 0x80 >> (auto_id_len - 1);
        Ok(ElementId { len: auto_id_len as u8, buf })
    }

    /// Reads one encoded ID from the front of `input`, returning it together
    /// with the number of bytes consumed.
    pub fn read(input: &[u8]) -> Result<(Self, usize)> {
        let first = *input.first().ok_or(Error::TruncatedVarint)?;
        let n = prefix_width(first)?;
        if input.len() < n {
            return Err(Error::TruncatedVarint);
        }

        let mut buf = [0u8; MAX_WIDTH];
        buf[..n].copy_from_slice(&input[..n]);
        Ok((ElementId { len: n as u8, buf }, n))
    }

    /// The encoded bytes of this ID.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// 64-bit FNV-1a over `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Appends `value` as its minimal big-endian significant bytes.
///
/// Zero has no significant bytes and appends nothing; decoding empty content
/// yields zero again.
pub fn put_uint(out: &mut Vec<u8>, value: u64) {
    let n = (64 - value.leading_zeros() as usize + 7) / 8;
    out.extend_from_slice(&value.to_be_bytes()[MAX_WIDTH - n..]);
}

/// Appends `value` as its minimal big-endian two's-complement bytes.
///
/// The width is the smallest whose two's-complement range contains the
/// value, so the top bit of the first byte always reflects the sign: −128 is
/// the single byte `80` while −129 needs two, and `0x800000` needs four so
/// its leading bit reads as positive.
pub fn put_int(out: &mut Vec<u8>, value: i64) {
    if value == 0 {
        return;
    }
    let mut n = 1;
    while n < MAX_WIDTH {
        let bits = 8 * n - 1;
        if value >= -(1i64 << bits) && value < (1i64 << bits) {
            break;
        }
        n += 1;
    }
    out.extend_from_slice(&value.to_be_bytes()[MAX_WIDTH - n..]);
}

/// Decodes big-endian content bytes as an unsigned integer.
pub fn take_uint(content: &[u8]) -> Result<u64> {
    if content.len() > MAX_WIDTH {
        return Err(Error::IntegerTooWide(content.len()));
    }
    let mut value = 0u64;
    for &b in content {
        value = value << 8 | b as u64;
    }
    Ok(value)
}

/// Decodes big-endian content bytes as a signed integer, sign-extending
/// from the top bit of the first byte.
pub fn take_int(content: &[u8]) -> Result<i64> {
    if content.len() > MAX_WIDTH {
        return Err(Error::IntegerTooWide(content.len()));
    }
    let mut value = match content.first() {
        Some(&b) if b & 0x80 != 0 => -1i64,
        _ => 0,
    };
    for &b in content {
        value = value << 8 | (b as i64 & 0xFF);
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    fn varint(value: u64, min_bytes: usize) -> Vec<u8> {
        let mut out = Vec::new();
        put_varint(&mut out, value, min_bytes).unwrap();
        out
    }

    fn varlen(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        put_varlen(&mut out, value).unwrap();
        out
    }

    #[test]
    fn varint_round_trip() {
        macro_rules! test {
            ($value:expr, $min:expr, $bytes:expr) => {{
                let encoded = varint($value, $min);
                assert_eq!(&$bytes[..], &encoded[..]);
                assert_eq!(($value, encoded.len()),
                           take_varint(&encoded).unwrap());
            }};
        }

        test!(0, 1, [0x80]);
        test!(1, 1, [0x81]);
        test!(127, 1, [0xFF]);
        test!(128, 1, [0x40, 0x80]);
        test!(300, 1, [0x41, 0x2C]);
        test!(300, 4, [0x10, 0x00, 0x01, 0x2C]);
        test!(1, 8, [0x01, 0, 0, 0, 0, 0, 0, 0x01]);
        test!((1 << 56) - 1, 1,
              [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn varint_min_width_never_shrinks() {
        for min in 1..=8 {
            for &value in &[0u64, 1, 127, 128, 300, 1 << 20, (1 << 56) - 1] {
                let encoded = varint(value, min);
                assert!(encoded.len() >= min);
                assert_eq!((value, encoded.len()),
                           take_varint(&encoded).unwrap());
            }
        }
    }

    #[test]
    fn varint_rejects_oversized_value() {
        let mut out = Vec::new();
        match put_varint(&mut out, 1 << 56, 1) {
            Err(Error::VarintOverflow(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn varint_rejects_bad_width() {
        let mut out = Vec::new();
        match put_varint(&mut out, 1, 9) {
            Err(Error::IdLenOutOfRange(9)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_zero_leading_byte() {
        match take_varint(&[0x00, 0x01]) {
            Err(Error::InvalidVarint) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_truncation() {
        match take_varint(&[0x41]) {
            Err(Error::TruncatedVarint) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        match take_varint(&[]) {
            Err(Error::TruncatedVarint) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn varlen_pads_near_tier_boundary() {
        assert_eq!(vec![0xFD], varlen(125));
        assert_eq!(vec![0x40, 0x7E], varlen(126));
        assert_eq!(vec![0x40, 0x7F], varlen(127));
        assert_eq!(vec![0x40, 0x80], varlen(128));
        // Decodes like any other varint.
        assert_eq!((126, 2), take_varint(&varlen(126)).unwrap());
    }

    #[test]
    fn literal_ids_keep_their_bytes() {
        assert_eq!(&[0x1A, 0x45, 0xDF, 0xA3],
                   ElementId::from_literal(DOC_MAGIC).as_bytes());
        assert_eq!(&[0x42, 0x86],
                   ElementId::from_literal(ID_VERSION).as_bytes());
        assert_eq!(&[0x81],
                   ElementId::from_literal(SEQUENCE_MARKER).as_bytes());
    }

    #[test]
    fn named_ids_are_deterministic_and_padded() {
        let a = ElementId::from_name("content", 4).unwrap();
        let b = ElementId::from_name("content", 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(4, a.as_bytes().len());
        // The padded form still parses as one varint of the right width.
        let (parsed, consumed) = ElementId::read(a.as_bytes()).unwrap();
        assert_eq!(4, consumed);
        assert_eq!(a, parsed);
    }

    #[test]
    fn named_ids_distinct_across_corpus() {
        let corpus = ["map", "vec", "segment", "polymorphic", "content",
                      "first", "second", "specialization", "baseVal",
                      "aVal", "bVal"];
        for (i, a) in corpus.iter().enumerate() {
            for b in &corpus[i + 1..] {
                assert_ne!(ElementId::from_name(a, 4).unwrap(),
                           ElementId::from_name(b, 4).unwrap(),
                           "{} and {} collide", a, b);
            }
        }
    }

    #[test]
    fn uint_minimal_bytes() {
        macro_rules! test {
            ($value:expr, $bytes:expr) => {{
                let mut out = Vec::new();
                put_uint(&mut out, $value);
                assert_eq!(&$bytes[..], &out[..]);
                assert_eq!($value, take_uint(&out).unwrap());
            }};
        }

        test!(0u64, [0u8; 0]);
        test!(1u64, [0x01]);
        test!(255u64, [0xFF]);
        test!(256u64, [0x01, 0x00]);
        test!(0x0080_0000u64, [0x80, 0x00, 0x00]);
        test!(u64::MAX, [0xFF; 8]);
    }

    #[test]
    fn int_minimal_twos_complement() {
        macro_rules! test {
            ($value:expr, $bytes:expr) => {{
                let mut out = Vec::new();
                put_int(&mut out, $value);
                assert_eq!(&$bytes[..], &out[..]);
                assert_eq!($value, take_int(&out).unwrap());
            }};
        }

        test!(0i64, [0u8; 0]);
        test!(1i64, [0x01]);
        test!(-1i64, [0xFF]);
        test!(-2i64, [0xFE]);
        test!(127i64, [0x7F]);
        test!(128i64, [0x00, 0x80]);
        test!(-127i64, [0x81]);
        test!(-128i64, [0x80]);
        test!(-129i64, [0xFF, 0x7F]);
        test!(256i64, [0x01, 0x00]);
        test!(0x0080_0000i64, [0x00, 0x80, 0x00, 0x00]);
        test!(i64::MIN, [0x80, 0, 0, 0, 0, 0, 0, 0]);
        test!(i64::MAX, [0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn integers_wider_than_eight_bytes_rejected() {
        match take_uint(&[0u8; 9]) {
            Err(Error::IntegerTooWide(9)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        match take_int(&[0u8; 9]) {
            Err(Error::IntegerTooWide(9)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
