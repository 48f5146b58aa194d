//! SPARTN frame CRCs.
//!
//! The transport layer selects one of four CRC widths with its 2-bit CRC type field.
//! All are MSB first (unreflected) and computed over the frame core, i.e., every byte
//! after the preamble except the last CRC-length bytes of the frame.
use crc::{Crc, CRC_16_XMODEM, CRC_24_LTE_A, CRC_32_MPEG_2, CRC_8_SMBUS};

/// CRC-8 CCITT, poly 0x07, init 0.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);
/// CRC-16 CCITT, poly 0x1021, init 0.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);
/// CRC-24 Radix-64, poly 0x864CFB, init 0.
const CRC24: Crc<u32> = Crc::<u32>::new(&CRC_24_LTE_A);
/// CRC-32 CCITT, poly 0x04C11DB7, init 0xFFFFFFFF, no final xor.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CrcType {
    #[display("CRC-8")]
    Crc8,
    #[display("CRC-16")]
    Crc16,
    #[display("CRC-24")]
    Crc24,
    #[display("CRC-32")]
    Crc32,
}

impl CrcType {
    /// Map the 2-bit transport field value to a ``CrcType``. Only the low 2 bits are used.
    #[must_use]
    pub fn from_bits(val: u8) -> Self {
        match val & 0x3 {
            0 => CrcType::Crc8,
            1 => CrcType::Crc16,
            2 => CrcType::Crc24,
            _ => CrcType::Crc32,
        }
    }

    /// Number of bytes used by the CRC on the wire.
    #[must_use]
    pub fn len(self) -> usize {
        match self {
            CrcType::Crc8 => 1,
            CrcType::Crc16 => 2,
            CrcType::Crc24 => 3,
            CrcType::Crc32 => 4,
        }
    }

    /// Number of bits used by the CRC on the wire.
    #[must_use]
    pub fn bits(self) -> usize {
        self.len() * 8
    }

    #[must_use]
    pub fn checksum(self, dat: &[u8]) -> u32 {
        match self {
            CrcType::Crc8 => u32::from(CRC8.checksum(dat)),
            CrcType::Crc16 => u32::from(CRC16.checksum(dat)),
            CrcType::Crc24 => CRC24.checksum(dat),
            CrcType::Crc32 => CRC32.checksum(dat),
        }
    }

    /// True if `expected` matches the CRC computed over `core`.
    #[must_use]
    pub fn is_valid(self, core: &[u8], expected: u32) -> bool {
        self.checksum(core) == expected
    }
}
