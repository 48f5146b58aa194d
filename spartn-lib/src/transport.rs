//! SPARTN transport frame.
//!
//! The transport layer is a sequence of bit-packed fields where the size or presence of
//! later fields depends on earlier ones:
//! ```text
//! | preamble 8 | msg type 7 | n data 10 | eaf 1 | crc type 2 | frame crc 4 |
//! | subtype 4 | time tag type 1 | time tag 16/32 | solution id 7 | solution proc id 4 |
//! [ encryption id 4 | encryption seq 6 | auth ind 3 | emb auth len 3 ]   <- eaf only
//! | payload n data bytes | [ embedded auth data ] | crc 8/16/24/32 |
//! ```
use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::bits::{bits_bytes, bits_value};
use crate::crc::CrcType;
use crate::identity;
use crate::prelude::*;

/// SPARTN preamble, the first byte of every frame.
pub const PREAMBLE: u8 = 0x73;

/// GNSS time tag in either of its transport encodings.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTag {
    /// Seconds within the current half day. Ambiguous without an outside time reference.
    HalfDay(u16),
    /// Seconds since the SPARTN time origin, 2010-01-01T00:00:00 GPST.
    Absolute(u32),
}

impl TimeTag {
    /// The 1-bit time tag type field value.
    #[must_use]
    pub fn type_bit(self) -> u8 {
        match self {
            TimeTag::HalfDay(_) => 0,
            TimeTag::Absolute(_) => 1,
        }
    }

    /// The raw time tag value as found in the frame.
    #[must_use]
    pub fn value(self) -> u32 {
        match self {
            TimeTag::HalfDay(v) => u32::from(v),
            TimeTag::Absolute(v) => v,
        }
    }
}

/// Payload description extension, present when the encryption and authentication
/// flag is set.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encryption {
    pub encryption_id: u8,
    pub encryption_seq: u8,
    pub auth_ind: u8,
    pub emb_auth_len: u8,
}

impl Encryption {
    /// Number of bits of embedded authentication data that follow the payload.
    #[must_use]
    pub fn auth_bits(&self) -> usize {
        if self.auth_ind <= 1 {
            return 0;
        }
        match self.emb_auth_len {
            0 => 64,
            1 => 94,
            2 => 128,
            3 => 256,
            4 => 512,
            // reserved lengths carry no data
            _ => 0,
        }
    }
}

/// Embedded authentication data.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAuth {
    /// Number of significant bits.
    pub bits: usize,
    /// Data bits, left aligned.
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    pub data: Vec<u8>,
}

/// Transport fields preceding the payload, along with the frame layout they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub msg_type: u8,
    pub n_data: u16,
    pub eaf: bool,
    pub crc_type: CrcType,
    pub frame_crc: u8,
    pub msg_subtype: u8,
    pub time_tag: TimeTag,
    pub solution_id: u8,
    pub solution_proc_id: u8,
    pub encryption: Option<Encryption>,
    /// Bit offset of the first payload byte. Always byte aligned.
    pub payload_offset: usize,
}

/// Bounds-checked, forward-only reader over a frame's bits.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn ensure(&self, len: usize) -> Result<()> {
        let minimum = (self.pos + len).div_ceil(8);
        if minimum > self.buf.len() {
            return Err(Error::NotEnoughData {
                actual: self.buf.len(),
                minimum,
            });
        }
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<u64> {
        self.ensure(len)?;
        let val = bits_value(self.buf, self.pos, len);
        self.pos += len;
        Ok(val)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_u8(&mut self, len: usize) -> Result<u8> {
        debug_assert!(len <= 8);
        Ok(self.read(len)? as u8)
    }
}

impl Header {
    /// Parse the header fields from the start of `buf`.
    ///
    /// The preamble is checked before anything else is read.
    ///
    /// # Errors
    /// [Error::UnknownPreamble], or [Error::NotEnoughData] if `buf` ends before the
    /// payload.
    #[allow(clippy::cast_possible_truncation)]
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf);

        let preamble = cur.read_u8(8)?;
        if preamble != PREAMBLE {
            return Err(Error::UnknownPreamble(preamble));
        }

        // frame start
        let msg_type = cur.read_u8(7)?;
        let n_data = cur.read(10)? as u16;
        let eaf = cur.read(1)? == 1;
        let crc_type = CrcType::from_bits(cur.read_u8(2)?);
        let frame_crc = cur.read_u8(4)?;

        // payload description
        let msg_subtype = cur.read_u8(4)?;
        let time_tag = if cur.read(1)? == 1 {
            TimeTag::Absolute(cur.read(32)? as u32)
        } else {
            TimeTag::HalfDay(cur.read(16)? as u16)
        };
        let solution_id = cur.read_u8(7)?;
        let solution_proc_id = cur.read_u8(4)?;
        let encryption = if eaf {
            Some(Encryption {
                encryption_id: cur.read_u8(4)?,
                encryption_seq: cur.read_u8(6)?,
                auth_ind: cur.read_u8(3)?,
                emb_auth_len: cur.read_u8(3)?,
            })
        } else {
            None
        };
        // every branch above totals a whole number of bytes
        debug_assert_eq!(cur.pos % 8, 0, "payload not byte aligned");

        Ok(Header {
            msg_type,
            n_data,
            eaf,
            crc_type,
            frame_crc,
            msg_subtype,
            time_tag,
            solution_id,
            solution_proc_id,
            encryption,
            payload_offset: cur.pos,
        })
    }

    pub fn auth_bits(&self) -> usize {
        self.encryption.as_ref().map_or(0, Encryption::auth_bits)
    }

    /// Bit offset of the first bit after the payload.
    pub fn payload_end(&self) -> usize {
        self.payload_offset + usize::from(self.n_data) * 8
    }

    /// Bit offset of the trailing CRC.
    pub fn crc_offset(&self) -> usize {
        self.payload_end() + self.auth_bits()
    }

    /// Total frame length in bytes, including preamble and CRC.
    pub fn frame_len(&self) -> usize {
        (self.crc_offset() + self.crc_type.bits()).div_ceil(8)
    }
}

/// Compute the total length of the frame starting at `prefix[0]`.
///
/// Returns `Ok(None)` if `prefix` is too short to determine the length, in which case
/// a longer prefix should be tried.
///
/// # Errors
/// [Error::UnknownPreamble] if `prefix` does not start with the SPARTN preamble.
pub fn frame_length(prefix: &[u8]) -> Result<Option<usize>> {
    match Header::parse(prefix) {
        Ok(header) => Ok(Some(header.frame_len())),
        Err(Error::NotEnoughData { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// A single decoded SPARTN transport frame.
///
/// Frames are created by a [Decoder](crate::Decoder) and cannot be modified afterwards;
/// every field is exposed through a read-only accessor.
///
/// The payload is not decoded into correction attributes here. It is either the
/// plaintext or, for encrypted frames not decrypted by the decoder, the ciphertext.
/// See [TransportFrame::is_decrypted].
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFrame {
    msg_type: u8,
    n_data: u16,
    eaf: bool,
    crc_type: CrcType,
    frame_crc: u8,
    msg_subtype: u8,
    time_tag: TimeTag,
    solution_id: u8,
    solution_proc_id: u8,
    encryption: Option<Encryption>,
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    payload: Vec<u8>,
    decrypted: bool,
    emb_auth: Option<EmbeddedAuth>,
    crc: u32,

    #[cfg_attr(feature = "serde", serde(skip))]
    data: Vec<u8>,
}

impl TransportFrame {
    /// Assemble a frame from its parsed parts. `buf` must contain at least the whole
    /// frame described by `header`.
    pub(crate) fn assemble(
        header: Header,
        buf: &[u8],
        payload: Vec<u8>,
        decrypted: bool,
    ) -> Self {
        let auth_bits = header.auth_bits();
        let emb_auth = if auth_bits > 0 {
            Some(EmbeddedAuth {
                bits: auth_bits,
                data: bits_bytes(buf, header.payload_end(), auth_bits),
            })
        } else {
            None
        };
        #[allow(clippy::cast_possible_truncation)]
        let crc = bits_value(buf, header.crc_offset(), header.crc_type.bits()) as u32;

        TransportFrame {
            msg_type: header.msg_type,
            n_data: header.n_data,
            eaf: header.eaf,
            crc_type: header.crc_type,
            frame_crc: header.frame_crc,
            msg_subtype: header.msg_subtype,
            time_tag: header.time_tag,
            solution_id: header.solution_id,
            solution_proc_id: header.solution_proc_id,
            encryption: header.encryption,
            payload,
            decrypted,
            emb_auth,
            crc,
            data: buf[..header.frame_len()].to_vec(),
        }
    }

    #[must_use]
    pub fn preamble(&self) -> u8 {
        PREAMBLE
    }

    #[must_use]
    pub fn msg_type(&self) -> u8 {
        self.msg_type
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn n_data(&self) -> u16 {
        self.n_data
    }

    /// Encryption and authentication flag.
    #[must_use]
    pub fn eaf(&self) -> bool {
        self.eaf
    }

    #[must_use]
    pub fn crc_type(&self) -> CrcType {
        self.crc_type
    }

    /// The 4-bit frame CRC fragment. Reported as-is, not validated.
    #[must_use]
    pub fn frame_crc(&self) -> u8 {
        self.frame_crc
    }

    #[must_use]
    pub fn msg_subtype(&self) -> u8 {
        self.msg_subtype
    }

    #[must_use]
    pub fn time_tag(&self) -> TimeTag {
        self.time_tag
    }

    /// 0 for a 16-bit half-day time tag, 1 for a 32-bit time tag.
    #[must_use]
    pub fn time_tag_type(&self) -> u8 {
        self.time_tag.type_bit()
    }

    #[must_use]
    pub fn gnss_time_tag(&self) -> u32 {
        self.time_tag.value()
    }

    #[must_use]
    pub fn solution_id(&self) -> u8 {
        self.solution_id
    }

    #[must_use]
    pub fn solution_proc_id(&self) -> u8 {
        self.solution_proc_id
    }

    /// The encryption extension fields, present only when [Self::eaf] is set.
    #[must_use]
    pub fn encryption(&self) -> Option<Encryption> {
        self.encryption
    }

    #[must_use]
    pub fn encryption_id(&self) -> Option<u8> {
        self.encryption.map(|e| e.encryption_id)
    }

    #[must_use]
    pub fn encryption_seq(&self) -> Option<u8> {
        self.encryption.map(|e| e.encryption_seq)
    }

    #[must_use]
    pub fn auth_ind(&self) -> Option<u8> {
        self.encryption.map(|e| e.auth_ind)
    }

    #[must_use]
    pub fn emb_auth_len(&self) -> Option<u8> {
        self.encryption.map(|e| e.emb_auth_len)
    }

    /// Payload bytes; always exactly [Self::n_data] bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True when the payload was encrypted and has been decrypted.
    #[must_use]
    pub fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    #[must_use]
    pub fn emb_auth(&self) -> Option<&EmbeddedAuth> {
        self.emb_auth.as_ref()
    }

    /// The trailing CRC value.
    #[must_use]
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Message name for this frame's type and subtype, or [identity::UNKNOWN].
    #[must_use]
    pub fn identity(&self) -> &'static str {
        identity::lookup(self.msg_type, self.msg_subtype).unwrap_or(identity::UNKNOWN)
    }

    /// The raw frame bytes, preamble through CRC.
    #[must_use]
    pub fn serialize(&self) -> &[u8] {
        &self.data
    }

    /// Frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The frame time, if it carries a 32-bit time tag.
    #[cfg(feature = "timecode")]
    #[must_use]
    pub fn epoch(&self) -> Option<hifitime::Epoch> {
        match self.time_tag {
            TimeTag::Absolute(t) => Some(crate::timetag::epoch(t)),
            TimeTag::HalfDay(_) => None,
        }
    }
}

impl Display for TransportFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<SPARTN({}, msgType={}, nData={}, eaf={}, crcType={}, frameCrc={}, msgSubtype={}, \
             timeTagtype={}, gnssTimeTag={}, solutionId={}, solutionProcId={}",
            self.identity(),
            self.msg_type,
            self.n_data,
            u8::from(self.eaf),
            self.crc_type,
            self.frame_crc,
            self.msg_subtype,
            self.time_tag_type(),
            self.gnss_time_tag(),
            self.solution_id,
            self.solution_proc_id,
        )?;
        if let Some(enc) = self.encryption {
            write!(
                f,
                ", encryptionId={}, encryptionSeq={}, authInd={}, embAuthLen={}",
                enc.encryption_id, enc.encryption_seq, enc.auth_ind, enc.emb_auth_len
            )?;
        }
        write!(f, ", payload=[len={}], crc={})>", self.payload.len(), self.crc)
    }
}
