#![doc = include_str!("../README.md")]

mod bytes;
mod error;

pub mod bits;
mod config;
pub mod crc;
mod decoder;
pub mod decrypt;
pub mod identity;
pub mod iv;
pub mod payload;
mod stream;
pub mod timetag;
mod transport;

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}

pub use config::DecodeConfig;
pub use crc::CrcType;
pub use decoder::{decode, Decoder};
pub use decrypt::{AesCtrDecryptor, Decryptor, Key};
pub use error::{Error, Result};
pub use stream::{read_frames, ErrorHandling, FrameReader};
pub use timetag::TimeAnchor;
pub use transport::{frame_length, EmbeddedAuth, Encryption, TimeTag, TransportFrame, PREAMBLE};
