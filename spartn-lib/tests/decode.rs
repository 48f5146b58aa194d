mod common;

use common::{TestEncryption, TestFrame};
use spartn::iv::{initialization_vector, IvFields};
use spartn::*;
use test_case::test_case;

const KEY: &str = "000102030405060708090a0b0c0d0e0f";

fn key() -> Key {
    Key::from_hex(KEY).unwrap()
}

fn decrypting_decoder(anchor: Option<TimeAnchor>) -> Decoder {
    let config = match anchor {
        Some(anchor) => DecodeConfig::builder()
            .decrypt(true)
            .key(KEY)
            .time_anchor(anchor)
            .build(),
        None => DecodeConfig::builder().decrypt(true).key(KEY).build(),
    };
    Decoder::new(config).unwrap()
}

fn ocb_frame() -> TestFrame {
    TestFrame {
        msg_type: 0,
        msg_subtype: 0,
        time_tag: TimeTag::Absolute(0x1a2b_3c4d),
        solution_id: 5,
        solution_proc_id: 11,
        payload: (0u8..12).collect(),
        ..Default::default()
    }
}

fn encrypt(parts: &TestFrame, time_tag: u32, plaintext: &[u8]) -> Vec<u8> {
    let enc = parts.encryption.unwrap();
    let iv = initialization_vector(&IvFields {
        msg_type: parts.msg_type,
        n_data: u16::try_from(plaintext.len()).unwrap(),
        msg_subtype: parts.msg_subtype,
        time_tag,
        solution_id: parts.solution_id,
        solution_proc_id: parts.solution_proc_id,
        encryption_id: enc.encryption_id,
        encryption_seq: enc.encryption_seq,
    });
    // counter mode is symmetric
    AesCtrDecryptor.decrypt(plaintext, &key(), &iv).unwrap()
}

#[test]
fn test_decode_unencrypted_crc8() {
    let parts = TestFrame {
        msg_type: 5,
        msg_subtype: 0,
        crc_type: 0,
        payload: vec![0xa5; 12],
        ..Default::default()
    };
    let dat = parts.build();

    let frame = decode(&dat).unwrap();

    assert_eq!(frame.preamble(), PREAMBLE);
    assert_eq!(frame.msg_type(), 5);
    assert_eq!(frame.n_data(), 12);
    assert!(!frame.eaf());
    assert_eq!(frame.crc_type(), CrcType::Crc8);
    assert_eq!(frame.payload(), &[0xa5; 12]);
    assert!(frame.encryption().is_none());
    assert!(frame.encryption_id().is_none());
    assert!(frame.emb_auth().is_none());
    assert!(!frame.is_decrypted());
    assert_eq!(frame.len(), dat.len());
    assert_eq!(frame.serialize(), &dat[..]);
    assert_eq!(frame.crc(), u32::from(dat[dat.len() - 1]));
}

#[test]
fn test_decode_corrupted_crc() {
    let mut dat = TestFrame {
        msg_type: 5,
        payload: vec![0xa5; 12],
        ..Default::default()
    }
    .build();
    let last = dat.len() - 1;
    dat[last] ^= 0x01;

    let zult = decode(&dat);

    assert!(
        matches!(zult, Err(Error::InvalidCrc { .. })),
        "expected crc error, got {zult:?}"
    );
}

#[test_case(TestFrame { msg_type: 0, payload: vec![], ..Default::default() }; "empty payload")]
#[test_case(TestFrame { msg_type: 127, msg_subtype: 15, solution_id: 127, solution_proc_id: 15, frame_crc: 15, payload: vec![0xff; 3], ..Default::default() }; "max fields")]
#[test_case(TestFrame { time_tag: TimeTag::Absolute(u32::MAX), payload: vec![1, 2, 3], ..Default::default() }; "max 32-bit tag")]
#[test_case(TestFrame { time_tag: TimeTag::HalfDay(43_199), crc_type: 1, payload: vec![9; 40], ..Default::default() }; "16-bit tag crc16")]
#[test_case(TestFrame { crc_type: 2, payload: vec![7; 1023], ..Default::default() }; "max payload crc24")]
#[test_case(TestFrame { crc_type: 3, encryption: Some(TestEncryption { encryption_id: 15, encryption_seq: 63, auth_ind: 1, emb_auth_len: 7 }), payload: vec![3; 5], ..Default::default() }; "eaf without auth crc32")]
fn test_decode_preserves_fields(parts: TestFrame) {
    let dat = parts.build();

    let frame = decode(&dat).unwrap();

    assert_eq!(frame.msg_type(), parts.msg_type);
    assert_eq!(usize::from(frame.n_data()), parts.payload.len());
    assert_eq!(frame.payload(), &parts.payload[..]);
    assert_eq!(frame.crc_type(), CrcType::from_bits(parts.crc_type));
    assert_eq!(frame.frame_crc(), parts.frame_crc);
    assert_eq!(frame.msg_subtype(), parts.msg_subtype);
    assert_eq!(frame.time_tag(), parts.time_tag);
    assert_eq!(frame.time_tag_type(), parts.time_tag.type_bit());
    assert_eq!(frame.gnss_time_tag(), parts.time_tag.value());
    assert_eq!(frame.solution_id(), parts.solution_id);
    assert_eq!(frame.solution_proc_id(), parts.solution_proc_id);
    assert_eq!(frame.eaf(), parts.encryption.is_some());
    if let Some(enc) = parts.encryption {
        assert_eq!(frame.encryption_id(), Some(enc.encryption_id));
        assert_eq!(frame.encryption_seq(), Some(enc.encryption_seq));
        assert_eq!(frame.auth_ind(), Some(enc.auth_ind));
        assert_eq!(frame.emb_auth_len(), Some(enc.emb_auth_len));
    }
    assert_eq!(frame.len(), dat.len());
}

#[test]
fn test_time_tag_type_moves_payload() {
    let payload = vec![0xde, 0xad, 0xbe, 0xef];
    let short = TestFrame {
        time_tag: TimeTag::HalfDay(100),
        payload: payload.clone(),
        ..Default::default()
    }
    .build();
    let long = TestFrame {
        time_tag: TimeTag::Absolute(100),
        payload: payload.clone(),
        ..Default::default()
    }
    .build();

    assert_eq!(long.len(), short.len() + 2);
    assert_eq!(decode(&short).unwrap().payload(), &payload[..]);
    assert_eq!(decode(&long).unwrap().payload(), &payload[..]);
}

#[test]
fn test_eaf_adds_encryption_fields() {
    let plain = TestFrame {
        payload: vec![1; 4],
        ..Default::default()
    }
    .build();
    let encrypted = TestFrame {
        encryption: Some(TestEncryption {
            encryption_id: 1,
            encryption_seq: 2,
            auth_ind: 0,
            emb_auth_len: 0,
        }),
        payload: vec![1; 4],
        ..Default::default()
    }
    .build();

    assert_eq!(encrypted.len(), plain.len() + 2);
    let frame = decode(&encrypted).unwrap();
    assert_eq!(frame.payload(), &[1; 4]);
    assert!(!frame.is_decrypted(), "default decoder must not decrypt");
}

#[test]
fn test_embedded_auth_128() {
    let auth: Vec<u8> = (0x80..0x90).collect();
    let parts = TestFrame {
        msg_type: 1,
        encryption: Some(TestEncryption {
            encryption_id: 3,
            encryption_seq: 9,
            auth_ind: 2,
            emb_auth_len: 2,
        }),
        payload: vec![0x11; 20],
        emb_auth: auth.clone(),
        ..Default::default()
    };
    let dat = parts.build();

    let frame = decode(&dat).unwrap();

    let emb = frame.emb_auth().expect("frame should have embedded auth");
    assert_eq!(emb.bits, 128);
    assert_eq!(emb.data, auth);
    assert_eq!(frame.payload(), &[0x11; 20]);
    assert_eq!(frame.len(), dat.len());
}

// 6 payload bytes end at bit 144; 94 auth bits end at 238, 2 bits into the byte
// that ends the CRC core
fn auth_94_frame() -> Vec<u8> {
    TestFrame {
        crc_type: 1,
        encryption: Some(TestEncryption {
            encryption_id: 0,
            encryption_seq: 0,
            auth_ind: 3,
            emb_auth_len: 1,
        }),
        payload: vec![0x22; 6],
        emb_auth: vec![0xff; 12],
        ..Default::default()
    }
    .build()
}

#[test]
fn test_embedded_auth_94_unaligned_crc() {
    let dat = auth_94_frame();

    let frame = decode(&dat).unwrap();

    let emb = frame.emb_auth().unwrap();
    assert_eq!(emb.bits, 94);
    assert_eq!(emb.data.len(), 12);
    assert_eq!(emb.data[11], 0xfc, "auth data should be left aligned");
    assert_eq!(frame.len(), dat.len());
    assert_eq!(frame.len(), 32);
}

#[test]
fn test_unaligned_crc_covers_all_auth_bits() {
    let dat = auth_94_frame();

    for bit in 144..238 {
        let mut corrupt = dat.clone();
        corrupt[bit / 8] ^= 0x80 >> (bit % 8);
        let zult = decode(&corrupt);
        assert!(
            matches!(zult, Err(Error::InvalidCrc { .. })),
            "flip of auth bit {bit} not detected: {zult:?}"
        );
    }
}

#[test]
fn test_wrong_preamble() {
    let mut dat = ocb_frame().build();
    dat[0] = 0xd3;

    let zult = decode(&dat);

    assert!(matches!(zult, Err(Error::UnknownPreamble(0xd3))));
}

#[test]
fn test_every_other_first_byte_is_rejected() {
    let good = ocb_frame().build();

    for b in (0..=u8::MAX).filter(|b| *b != PREAMBLE) {
        let mut dat = good.clone();
        dat[0] = b;
        let zult = decode(&dat);
        assert!(
            matches!(zult, Err(Error::UnknownPreamble(got)) if got == b),
            "first byte {b:#04x}: {zult:?}"
        );
    }
}

#[test]
fn test_truncated_frame() {
    let dat = ocb_frame().build();

    for len in 0..dat.len() {
        let zult = decode(&dat[..len]);
        assert!(
            matches!(zult, Err(Error::NotEnoughData { .. })),
            "len={len} got {zult:?}"
        );
    }
}

#[test]
fn test_trailing_bytes_ignored() {
    let mut dat = ocb_frame().build();
    let len = dat.len();
    dat.extend_from_slice(&[PREAMBLE, 0x00, 0x01]);

    let frame = decode(&dat).unwrap();

    assert_eq!(frame.len(), len);
    assert_eq!(frame.serialize(), &dat[..len]);
}

#[test]
fn test_every_bit_flip_is_detected() {
    let dat = TestFrame {
        crc_type: 1,
        payload: vec![0x5a; 8],
        ..ocb_frame()
    }
    .build();

    // skip the fields that change the frame layout: nData, eaf, crcType, timeTagType
    let layout = |bit: usize| (15..28).contains(&bit) || bit == 36;
    for bit in (8..dat.len() * 8).filter(|b| !layout(*b)) {
        let mut corrupt = dat.clone();
        corrupt[bit / 8] ^= 0x80 >> (bit % 8);
        let zult = decode(&corrupt);
        assert!(
            matches!(zult, Err(Error::InvalidCrc { .. })),
            "flip of bit {bit} not detected: {zult:?}"
        );
    }
}

#[test]
fn test_no_validate_accepts_bad_crc() {
    let mut dat = ocb_frame().build();
    // first payload byte
    dat[10] ^= 0xff;
    let decoder = Decoder::new(DecodeConfig::builder().validate(false).build()).unwrap();

    let frame = decoder.decode(&dat).unwrap();

    assert_eq!(frame.payload()[0], 0xff);
    assert!(decode(&dat).is_err());
}

#[test_case(0, 0, "SPARTN-1X-OCB-GPS")]
#[test_case(1, 2, "SPARTN-1X-HPAC-GAL")]
#[test_case(2, 0, "SPARTN-1X-GAD")]
#[test_case(0, 9, identity::UNKNOWN)]
fn test_identity(msg_type: u8, msg_subtype: u8, expected: &str) {
    let dat = TestFrame {
        msg_type,
        msg_subtype,
        ..Default::default()
    }
    .build();

    assert_eq!(decode(&dat).unwrap().identity(), expected);
}

#[test]
fn test_decrypt_absolute_time_tag() {
    let plaintext: Vec<u8> = (0u8..45).collect();
    let mut parts = TestFrame {
        encryption: Some(TestEncryption {
            encryption_id: 2,
            encryption_seq: 33,
            auth_ind: 0,
            emb_auth_len: 0,
        }),
        ..ocb_frame()
    };
    parts.payload = encrypt(&parts, parts.time_tag.value(), &plaintext);
    assert_ne!(parts.payload, plaintext);
    let dat = parts.build();

    let frame = decrypting_decoder(None).decode(&dat).unwrap();

    assert!(frame.is_decrypted());
    assert_eq!(frame.payload(), &plaintext[..]);
    assert_eq!(frame.n_data(), 45);
}

#[test]
fn test_decrypt_unencrypted_frame_is_passthrough() {
    let dat = ocb_frame().build();

    let frame = decrypting_decoder(None).decode(&dat).unwrap();

    assert!(!frame.is_decrypted());
    assert_eq!(frame.payload(), &ocb_frame().payload[..]);
}

#[test]
fn test_decrypt_half_day_tag_without_anchor() {
    let dat = TestFrame {
        time_tag: TimeTag::HalfDay(1234),
        encryption: Some(TestEncryption {
            encryption_id: 1,
            encryption_seq: 1,
            auth_ind: 0,
            emb_auth_len: 0,
        }),
        ..ocb_frame()
    }
    .build();

    let zult = decrypting_decoder(None).decode(&dat);

    assert!(matches!(zult, Err(Error::AmbiguousTimeTag(1234))));
    // still decodable without decryption
    assert!(decode(&dat).is_ok());
}

#[test]
fn test_decrypt_half_day_tag_with_anchor() {
    let base = 9000 * timetag::HALF_DAY_SECS;
    let plaintext = vec![0x42; 16];
    let mut parts = TestFrame {
        time_tag: TimeTag::HalfDay(600),
        encryption: Some(TestEncryption {
            encryption_id: 4,
            encryption_seq: 7,
            auth_ind: 0,
            emb_auth_len: 0,
        }),
        ..ocb_frame()
    };
    parts.payload = encrypt(&parts, base + 600, &plaintext);
    let dat = parts.build();

    let anchor = TimeAnchor::with_time(base + 500);
    let frame = decrypting_decoder(Some(anchor)).decode(&dat).unwrap();

    assert_eq!(frame.payload(), &plaintext[..]);
}

#[test]
fn test_anchor_follows_absolute_time_tags() {
    let anchor = TimeAnchor::new();
    let decoder = decrypting_decoder(Some(anchor.clone()));

    decoder.decode(&ocb_frame().build()).unwrap();

    assert_eq!(anchor.get(), Some(0x1a2b_3c4d));
}

#[test]
fn test_key_from_environment() {
    std::env::remove_var(Key::ENV_VAR);
    let zult = Decoder::new(DecodeConfig::builder().decrypt(true).build());
    assert!(matches!(zult, Err(Error::MissingKey)));

    std::env::set_var(Key::ENV_VAR, KEY);
    let zult = Decoder::new(DecodeConfig::builder().decrypt(true).build());
    std::env::remove_var(Key::ENV_VAR);
    assert!(zult.is_ok(), "expected key from environment, got {:?}", zult.err());
}

#[test]
fn test_invalid_key() {
    let zult = Decoder::new(DecodeConfig::builder().decrypt(true).key("abcd").build());
    assert!(matches!(zult, Err(Error::InvalidKey(_))));
}

#[cfg(feature = "timecode")]
#[test]
fn test_epoch() {
    let frame = decode(
        &TestFrame {
            time_tag: TimeTag::Absolute(86_400),
            ..Default::default()
        }
        .build(),
    )
    .unwrap();

    let expected = hifitime::Epoch::from_gregorian(2010, 1, 2, 0, 0, 0, 0, hifitime::TimeScale::GPST);
    assert_eq!(frame.epoch(), Some(expected));

    let frame = decode(
        &TestFrame {
            time_tag: TimeTag::HalfDay(10),
            ..Default::default()
        }
        .build(),
    )
    .unwrap();
    assert_eq!(frame.epoch(), None);
}

#[test]
fn test_decode_payload_with_scaling() {
    use spartn::payload::{Field, Item, Repeat, Value, Width};

    const SAT: &[Item] = &[Item::Field(Field::scaled("CLOCK", Width::Fixed(8), 0.25))];
    const DEF: &[Item] = &[
        Item::Field(Field::new("MASK", Width::Fixed(8))),
        Item::Group {
            repeat: Repeat::BitsSet("MASK"),
            items: SAT,
        },
    ];
    let dat = TestFrame {
        payload: vec![0b1000_0001, 4, 10],
        ..ocb_frame()
    }
    .build();
    let decoder = Decoder::new(DecodeConfig::builder().scaling(true).build()).unwrap();

    let frame = decoder.decode(&dat).unwrap();
    let payload = decoder.decode_payload(&frame, DEF).unwrap();

    assert_eq!(payload.get("MASK"), Some(&Value::Int(0x81)));
    assert_eq!(payload.get("CLOCK_01"), Some(&Value::Scaled(1.0)));
    assert_eq!(payload.get("CLOCK_02"), Some(&Value::Scaled(2.5)));
    assert_eq!(payload.bits, 24);
}

#[test]
fn test_decode_payload_error_names_identity() {
    use spartn::payload::{Field, Item, Width};

    const DEF: &[Item] = &[Item::Field(Field::new("WIDE", Width::Fixed(100)))];
    let frame = decode(&ocb_frame().build()).unwrap();

    let err = Decoder::default().decode_payload(&frame, DEF).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error processing attribute 'WIDE' in message type SPARTN-1X-OCB-GPS"
    );
}

struct Xor;

impl Decryptor for Xor {
    fn decrypt(&self, ciphertext: &[u8], key: &Key, iv: &[u8; 16]) -> Result<Vec<u8>> {
        Ok(ciphertext
            .iter()
            .zip(key.as_bytes().iter().zip(iv).cycle())
            .map(|(c, (k, v))| c ^ k ^ v)
            .collect())
    }
}

#[test]
fn test_custom_decryptor() {
    let parts = TestFrame {
        encryption: Some(TestEncryption {
            encryption_id: 0,
            encryption_seq: 0,
            auth_ind: 0,
            emb_auth_len: 0,
        }),
        payload: vec![0; 4],
        ..ocb_frame()
    };
    let dat = parts.build();
    let iv = initialization_vector(&IvFields {
        msg_type: 0,
        n_data: 4,
        msg_subtype: 0,
        time_tag: parts.time_tag.value(),
        solution_id: parts.solution_id,
        solution_proc_id: parts.solution_proc_id,
        encryption_id: 0,
        encryption_seq: 0,
    });

    let frame = decrypting_decoder(None)
        .with_decryptor(Box::new(Xor))
        .decode(&dat)
        .unwrap();

    let expected: Vec<u8> = (0..4).map(|i| key().as_bytes()[i] ^ iv[i]).collect();
    assert_eq!(frame.payload(), &expected[..]);
}
