use std::env;

use tracing::{debug, trace};

use crate::crc::CrcType;
use crate::decrypt::{AesCtrDecryptor, Decryptor, Key};
use crate::iv::{initialization_vector, IvFields};
use crate::payload::{walk, Payload, PayloadDefinition};
use crate::prelude::*;
use crate::transport::{Header, TimeTag, TransportFrame};
use crate::DecodeConfig;

/// Decodes SPARTN transport frames.
///
/// A decoder holds only read-only configuration, the key, and the cipher, so a single
/// decoder can decode any number of independent frames, from any number of threads.
/// The one exception is an optional [TimeAnchor](crate::TimeAnchor), which the decoder
/// updates with the time tag of each decoded frame that carries a 32-bit time tag.
///
/// # Examples
/// Decode without decryption, validating CRCs.
/// ```
/// use spartn::Decoder;
///
/// let decoder = Decoder::default();
/// let zult = decoder.decode(&[0x72, 0x00]);
/// assert!(zult.is_err());
/// ```
/// Decode and decrypt.
/// ```
/// use spartn::{DecodeConfig, Decoder};
///
/// let decoder = Decoder::new(
///     DecodeConfig::builder()
///         .decrypt(true)
///         .key("00112233445566778899aabbccddeeff")
///         .build(),
/// ).unwrap();
/// ```
pub struct Decoder {
    config: DecodeConfig,
    key: Option<Key>,
    decryptor: Box<dyn Decryptor>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            config: DecodeConfig::default(),
            key: None,
            decryptor: Box::new(AesCtrDecryptor),
        }
    }
}

impl Decoder {
    /// Create a decoder, resolving the decryption key.
    ///
    /// # Errors
    /// [Error::MissingKey] if decryption is enabled and there is no key configured or
    /// in the environment, or [Error::InvalidKey] if the key cannot be decoded.
    pub fn new(config: DecodeConfig) -> Result<Self> {
        let key = match config.key {
            Some(ref hex) => Some(Key::from_hex(hex)?),
            None if config.decrypt => match env::var(Key::ENV_VAR) {
                Ok(hex) => {
                    debug!("using decryption key from {}", Key::ENV_VAR);
                    Some(Key::from_hex(&hex)?)
                }
                Err(_) => None,
            },
            None => None,
        };
        if config.decrypt && key.is_none() {
            return Err(Error::MissingKey);
        }

        Ok(Decoder {
            config,
            key,
            decryptor: Box::new(AesCtrDecryptor),
        })
    }

    /// Use `decryptor` rather than the default AES-128-CTR.
    #[must_use]
    pub fn with_decryptor(mut self, decryptor: Box<dyn Decryptor>) -> Self {
        self.decryptor = decryptor;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode the frame at the start of `buf`.
    ///
    /// Any bytes after the end of the frame are ignored.
    ///
    /// # Errors
    /// * [Error::UnknownPreamble] if `buf` does not start with the preamble
    /// * [Error::NotEnoughData] if `buf` is shorter than the frame
    /// * [Error::InvalidCrc] if CRC validation is enabled and fails
    /// * [Error::AmbiguousTimeTag] if decrypting a frame with a 16-bit time tag
    ///   without a time anchor
    /// * [Error::Decryption] on cipher failure
    pub fn decode(&self, buf: &[u8]) -> Result<TransportFrame> {
        let header = Header::parse(buf)?;
        let frame_len = header.frame_len();
        if buf.len() < frame_len {
            return Err(Error::NotEnoughData {
                actual: buf.len(),
                minimum: frame_len,
            });
        }
        trace!(
            msg_type = header.msg_type,
            msg_subtype = header.msg_subtype,
            n_data = header.n_data,
            frame_len,
            "parsed header"
        );

        if self.config.validate {
            validate_crc(&header, buf)?;
        }

        let start = header.payload_offset / 8;
        let mut payload = buf[start..start + usize::from(header.n_data)].to_vec();
        let mut decrypted = false;
        if let (Some(enc), true) = (header.encryption, self.config.decrypt) {
            let time_tag = match header.time_tag {
                TimeTag::Absolute(t) => t,
                TimeTag::HalfDay(t) => match self.config.time_anchor {
                    Some(ref anchor) => anchor.expand(t)?,
                    None => return Err(Error::AmbiguousTimeTag(t)),
                },
            };
            let iv = initialization_vector(&IvFields {
                msg_type: header.msg_type,
                n_data: header.n_data,
                msg_subtype: header.msg_subtype,
                time_tag,
                solution_id: header.solution_id,
                solution_proc_id: header.solution_proc_id,
                encryption_id: enc.encryption_id,
                encryption_seq: enc.encryption_seq,
            });
            // key presence is checked on construction
            let Some(ref key) = self.key else {
                return Err(Error::MissingKey);
            };
            payload = self.decryptor.decrypt(&payload, key, &iv)?;
            decrypted = true;
        }

        if let (Some(anchor), TimeTag::Absolute(t)) = (&self.config.time_anchor, header.time_tag)
        {
            anchor.set(t);
        }

        Ok(TransportFrame::assemble(header, buf, payload, decrypted))
    }

    /// Walk `frame`'s payload using `definition`, applying field resolutions if this
    /// decoder is configured for scaling.
    ///
    /// # Errors
    /// [Error::Attribute] wrapping the failure for the first attribute that could not
    /// be decoded.
    pub fn decode_payload(
        &self,
        frame: &TransportFrame,
        definition: PayloadDefinition,
    ) -> Result<Payload> {
        walk(
            definition,
            frame.payload(),
            self.config.scaling,
            frame.identity(),
        )
    }
}

/// Validate the CRC over the frame core, the bytes after the preamble excluding the
/// final CRC-length bytes of the frame.
///
/// When 94 bits of embedded auth leave the CRC unaligned, the last core byte holds both
/// auth bits and the leading CRC bits.
fn validate_crc(header: &Header, buf: &[u8]) -> Result<()> {
    let crc_offset = header.crc_offset();
    let crc_type: CrcType = header.crc_type;
    #[allow(clippy::cast_possible_truncation)]
    let actual = crate::bits::bits_value(buf, crc_offset, crc_type.bits()) as u32;
    let computed = crc_type.checksum(&buf[1..header.frame_len() - crc_type.len()]);
    if actual != computed {
        debug!(actual, computed, %crc_type, "crc mismatch");
        return Err(Error::InvalidCrc { actual, computed });
    }
    Ok(())
}

/// Decode a frame with the default configuration: CRC validation, no decryption.
///
/// # Errors
/// See [Decoder::decode].
pub fn decode(buf: &[u8]) -> Result<TransportFrame> {
    Decoder::default().decode(buf)
}
