//! AES initialization vector construction.

/// Transport fields that make up the 128-bit IV.
///
/// `time_tag` is always the 32-bit form. Frames carrying a 16-bit time tag must have
/// it expanded first, see [TimeAnchor](crate::TimeAnchor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvFields {
    pub msg_type: u8,
    pub n_data: u16,
    pub msg_subtype: u8,
    pub time_tag: u32,
    pub solution_id: u8,
    pub solution_proc_id: u8,
    pub encryption_id: u8,
    pub encryption_seq: u8,
}

/// Build the big-endian 128-bit IV.
///
/// Layout, most significant bit first:
/// ```text
/// | msg type 7 | n data 10 | subtype 4 | time tag 32 | sol id 7 | sol proc id 4 |
/// | encryption id 4 | encryption seq 6 | zero 53 | 1 |
/// ```
#[must_use]
pub fn initialization_vector(fields: &IvFields) -> [u8; 16] {
    let iv: u128 = (u128::from(fields.msg_type & 0x7f) << 121)
        | (u128::from(fields.n_data & 0x3ff) << 111)
        | (u128::from(fields.msg_subtype & 0xf) << 107)
        | (u128::from(fields.time_tag) << 75)
        | (u128::from(fields.solution_id & 0x7f) << 68)
        | (u128::from(fields.solution_proc_id & 0xf) << 64)
        | (u128::from(fields.encryption_id & 0xf) << 60)
        | (u128::from(fields.encryption_seq & 0x3f) << 54)
        | 1;
    iv.to_be_bytes()
}
