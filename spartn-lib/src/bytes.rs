use std::collections::VecDeque;
use std::io::{self, ErrorKind};

/// Bytes provides the ability to read bytes from a reader and push them
/// back if they are not needed, i.e., Peek-and-push. The original order of
/// the bytes is preserved when pushing bytes back.
pub(crate) struct Bytes<R>
where
    R: io::Read,
{
    reader: R,
    num_read: usize,
    cache: VecDeque<u8>,
    buf: [u8; 1],
}

impl<R> Bytes<R>
where
    R: io::Read,
{
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            cache: VecDeque::new(),
            buf: [0u8; 1],
        }
    }

    pub fn next(&mut self) -> Result<u8, io::Error> {
        if let Some(b) = self.cache.pop_front() {
            return Ok(b);
        }
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Err(io::Error::from(ErrorKind::UnexpectedEof)),
                Ok(_) => {
                    self.num_read += 1;
                    return Ok(self.buf[0]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Fill `buf`, first from pushed back bytes then from the reader. Returns the number
    /// of bytes filled, which is less than `buf.len()` only if the reader reached EOF.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        let cached = self.cache.len().min(buf.len());
        for (dst, src) in buf[..cached].iter_mut().zip(self.cache.drain(..cached)) {
            *dst = src;
        }

        let mut filled = cached;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.num_read += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }

    /// Push `dat` back so it is read again, in order, before any other bytes.
    pub fn push(&mut self, dat: &[u8]) {
        for b in dat.iter().rev() {
            self.cache.push_front(*b);
        }
    }

    /// Number of bytes consumed from the stream.
    pub fn offset(&self) -> usize {
        self.num_read - self.cache.len()
    }
}
