//! Reading frames from a byte stream.
//!
//! Streams, e.g., a serial port capture or a concatenation of MQTT payloads, may
//! contain bytes that are not SPARTN, or corrupted frames. The reader scans for the
//! preamble and on any frame that fails to decode resumes scanning at the byte
//! following that preamble.
use std::io::{ErrorKind, Read};

use tracing::{debug, trace, warn};

use crate::bytes::Bytes;
use crate::prelude::*;
use crate::transport::{frame_length, TransportFrame, PREAMBLE};
use crate::Decoder;

/// What a [FrameReader] does with frames that fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Drop the frame silently.
    Ignore,
    /// Drop the frame and log a warning.
    #[default]
    Log,
    /// Produce the error from the iterator. Iteration may continue afterwards.
    Raise,
}

/// Iterates over the frames in a byte stream.
///
/// The iterator ends at EOF; a partial frame at the end of the stream is skipped.
/// I/O errors other than EOF are always produced, regardless of [ErrorHandling].
pub struct FrameReader<R>
where
    R: Read,
{
    bytes: Bytes<R>,
    decoder: Decoder,
    errors: ErrorHandling,
    /// Number of bytes skipped while scanning for a preamble.
    pub skipped: usize,
    /// Number of candidate frames that failed to decode.
    pub failed: usize,
}

impl<R> FrameReader<R>
where
    R: Read,
{
    pub fn new(reader: R, decoder: Decoder) -> Self {
        FrameReader {
            bytes: Bytes::new(reader),
            decoder,
            errors: ErrorHandling::default(),
            skipped: 0,
            failed: 0,
        }
    }

    #[must_use]
    pub fn with_error_handling(mut self, errors: ErrorHandling) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Number of bytes consumed from the stream.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.bytes.offset()
    }

    /// Read the next candidate frame: a preamble followed by the number of bytes its
    /// header says the frame occupies. `Ok(None)` at EOF.
    ///
    /// A candidate cut short by EOF may have started at a data byte that happened to
    /// equal the preamble, so its bytes are pushed back and scanned again.
    fn candidate(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let b = match self.bytes.next() {
                Ok(b) => b,
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(Error::Io(err)),
            };
            if b != PREAMBLE {
                self.skipped += 1;
                continue;
            }

            let mut buf = vec![b];
            let len = loop {
                if let Some(len) = frame_length(&buf)? {
                    break Some(len);
                }
                match self.bytes.next() {
                    Ok(b) => buf.push(b),
                    Err(err) if err.kind() == ErrorKind::UnexpectedEof => break None,
                    Err(err) => return Err(Error::Io(err)),
                }
            };

            if let Some(len) = len {
                let start = buf.len();
                buf.resize(len, 0);
                let filled = self.bytes.fill(&mut buf[start..])?;
                if start + filled == len {
                    return Ok(Some(buf));
                }
                buf.truncate(start + filled);
            }

            trace!(len = buf.len(), "eof in frame, rescanning");
            self.skipped += 1;
            self.bytes.push(&buf[1..]);
        }
    }
}

impl<R> Iterator for FrameReader<R>
where
    R: Read,
{
    type Item = Result<TransportFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let buf = match self.candidate() {
                Ok(Some(buf)) => buf,
                Ok(None) => return None,
                Err(err) => return Some(Err(err)),
            };

            match self.decoder.decode(&buf) {
                Ok(frame) => return Some(Ok(frame)),
                Err(err) => {
                    // The preamble may have been a data byte; rescan from the one after it.
                    self.bytes.push(&buf[1..]);
                    self.failed += 1;
                    match self.errors {
                        ErrorHandling::Ignore => {
                            trace!(offset = self.offset(), "dropping frame: {err}");
                        }
                        ErrorHandling::Log => {
                            warn!(offset = self.offset(), "dropping frame: {err}");
                        }
                        ErrorHandling::Raise => {
                            debug!(offset = self.offset(), "frame error: {err}");
                            return Some(Err(err));
                        }
                    }
                }
            }
        }
    }
}

/// Return an iterator over the frames read from `reader`, decoded with `decoder`.
///
/// Frames that fail to decode are logged and skipped; for other error handling see
/// [FrameReader::with_error_handling].
///
/// # Examples
/// ```
/// use spartn::{read_frames, Decoder};
///
/// let dat: &[u8] = &[0x00, 0x01, 0x02];
/// let frames: Vec<_> = read_frames(dat, Decoder::default()).collect();
/// assert!(frames.is_empty());
/// ```
pub fn read_frames<R>(reader: R, decoder: Decoder) -> impl Iterator<Item = Result<TransportFrame>>
where
    R: Read,
{
    FrameReader::new(reader, decoder)
}
