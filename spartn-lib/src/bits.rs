//! Bit-field extraction.
//!
//! SPARTN fields are packed MSB first with no regard for byte boundaries, so every
//! field is read as an arbitrary run of bits from the start of the frame.

/// Return the unsigned value of `len` bits of `buf` starting at bit `offset`, most
/// significant bit first.
///
/// A zero length read returns 0.
///
/// # Panics
/// If `len > 64` or `offset + len` extends past the end of `buf`. Callers compute
/// offsets themselves, so this is an internal invariant, not an input error.
#[must_use]
pub fn bits_value(buf: &[u8], offset: usize, len: usize) -> u64 {
    assert!(len <= 64, "bit field too wide: {len}");
    assert!(
        offset + len <= buf.len() * 8,
        "bit field {offset}+{len} out of range for {} bytes",
        buf.len()
    );

    let mut val: u64 = 0;
    let mut pos = offset;
    let end = offset + len;
    while pos < end {
        let bit_in_byte = pos % 8;
        // take as many bits as remain in this byte, or as many as we still need
        let take = (8 - bit_in_byte).min(end - pos);
        let byte = u64::from(buf[pos / 8]);
        let chunk = (byte >> (8 - bit_in_byte - take)) & ((1 << take) - 1);
        val = (val << take) | chunk;
        pos += take;
    }
    val
}

/// Return `len` bits of `buf` starting at bit `offset` as bytes.
///
/// The bits are left aligned, i.e., when `len` is not a multiple of 8 the low bits of
/// the last byte are zero.
///
/// # Panics
/// If `offset + len` extends past the end of `buf`.
#[must_use]
pub fn bits_bytes(buf: &[u8], offset: usize, len: usize) -> Vec<u8> {
    assert!(
        offset + len <= buf.len() * 8,
        "bit field {offset}+{len} out of range for {} bytes",
        buf.len()
    );
    let mut out = Vec::with_capacity(len.div_ceil(8));
    let mut pos = offset;
    let end = offset + len;
    while pos < end {
        let take = (end - pos).min(8);
        #[allow(clippy::cast_possible_truncation)]
        let byte = (bits_value(buf, pos, take) << (8 - take)) as u8;
        out.push(byte);
        pos += take;
    }
    out
}

/// Number of bits set in `val`.
#[must_use]
pub fn num_bits_set(val: u64) -> usize {
    val.count_ones() as usize
}
