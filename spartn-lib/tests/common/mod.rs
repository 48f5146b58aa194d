#![allow(dead_code)]
use spartn::{CrcType, TimeTag, PREAMBLE};

/// Writes values MSB first at arbitrary bit offsets.
#[derive(Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn write(&mut self, val: u64, bits: usize) {
        for i in (0..bits).rev() {
            if self.len % 8 == 0 {
                self.buf.push(0);
            }
            if (val >> i) & 1 == 1 {
                let idx = self.len / 8;
                self.buf[idx] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
    }

    pub fn write_bytes(&mut self, dat: &[u8]) {
        for b in dat {
            self.write(u64::from(*b), 8);
        }
    }

    /// Write the first `bits` bits of `dat`.
    pub fn write_bits(&mut self, dat: &[u8], bits: usize) {
        for i in 0..bits {
            let bit = (dat[i / 8] >> (7 - i % 8)) & 1;
            self.write(u64::from(bit), 1);
        }
    }

    pub fn bit_len(&self) -> usize {
        self.len
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Encryption fields for [TestFrame].
#[derive(Debug, Clone, Copy)]
pub struct TestEncryption {
    pub encryption_id: u8,
    pub encryption_seq: u8,
    pub auth_ind: u8,
    pub emb_auth_len: u8,
}

/// Describes a frame to build. The CRC is computed unless `crc` is set.
#[derive(Debug, Clone)]
pub struct TestFrame {
    pub msg_type: u8,
    pub crc_type: u8,
    pub frame_crc: u8,
    pub msg_subtype: u8,
    pub time_tag: TimeTag,
    pub solution_id: u8,
    pub solution_proc_id: u8,
    pub encryption: Option<TestEncryption>,
    pub payload: Vec<u8>,
    pub emb_auth: Vec<u8>,
    pub crc: Option<u32>,
}

impl Default for TestFrame {
    fn default() -> Self {
        TestFrame {
            msg_type: 0,
            crc_type: 0,
            frame_crc: 0,
            msg_subtype: 0,
            time_tag: TimeTag::Absolute(0),
            solution_id: 0,
            solution_proc_id: 0,
            encryption: None,
            payload: Vec::new(),
            emb_auth: Vec::new(),
            crc: None,
        }
    }
}

pub fn auth_bits(enc: &TestEncryption) -> usize {
    if enc.auth_ind <= 1 {
        return 0;
    }
    match enc.emb_auth_len {
        0 => 64,
        1 => 94,
        2 => 128,
        3 => 256,
        4 => 512,
        _ => 0,
    }
}

impl TestFrame {
    pub fn build(&self) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.write(u64::from(PREAMBLE), 8);
        w.write(u64::from(self.msg_type), 7);
        w.write(self.payload.len() as u64, 10);
        w.write(u64::from(self.encryption.is_some()), 1);
        w.write(u64::from(self.crc_type), 2);
        w.write(u64::from(self.frame_crc), 4);
        w.write(u64::from(self.msg_subtype), 4);
        match self.time_tag {
            TimeTag::HalfDay(t) => {
                w.write(0, 1);
                w.write(u64::from(t), 16);
            }
            TimeTag::Absolute(t) => {
                w.write(1, 1);
                w.write(u64::from(t), 32);
            }
        }
        w.write(u64::from(self.solution_id), 7);
        w.write(u64::from(self.solution_proc_id), 4);
        if let Some(enc) = self.encryption {
            w.write(u64::from(enc.encryption_id), 4);
            w.write(u64::from(enc.encryption_seq), 6);
            w.write(u64::from(enc.auth_ind), 3);
            w.write(u64::from(enc.emb_auth_len), 3);
        }
        w.write_bytes(&self.payload);
        if let Some(enc) = self.encryption {
            let bits = auth_bits(&enc);
            let mut auth = self.emb_auth.clone();
            auth.resize(bits.div_ceil(8), 0);
            w.write_bits(&auth, bits);
        }

        let crc_type = CrcType::from_bits(self.crc_type);
        let crc = self.crc.unwrap_or_else(|| core_crc(&w, crc_type));
        w.write(u64::from(crc), crc_type.bits());
        w.bytes().to_vec()
    }
}

/// Compute the CRC for a frame written up to the start of its CRC.
///
/// The core ends `crc_type.len()` bytes before the end of the frame, so when the CRC is
/// not byte aligned its leading bits are part of the core. Those bits are chosen such
/// that they match the CRC they produce.
fn core_crc(w: &BitWriter, crc_type: CrcType) -> u32 {
    let shared = (8 - w.bit_len() % 8) % 8;
    if shared == 0 {
        return crc_type.checksum(&w.bytes()[1..]);
    }
    for lead in 0..1u32 << shared {
        let mut core = w.bytes()[1..].to_vec();
        if let Some(last) = core.last_mut() {
            *last |= u8::try_from(lead).unwrap();
        }
        let crc = crc_type.checksum(&core);
        if crc >> (crc_type.bits() - shared) == lead {
            return crc;
        }
    }
    panic!("no CRC consistent with its own leading bits");
}
