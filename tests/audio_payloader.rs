//! Payloader-level behavior for the audio path: FEC block boundaries, the
//! timestamp/sequence-number state machine, and AES round-tripping.

use aes::cipher::{BlockDecryptMut, KeyIvInit};
use moonlight_payload::audio::{AUDIO_DATA_SHARDS, AUDIO_PARITY_SHARDS, AUDIO_TOTAL_SHARDS};
use moonlight_payload::{fec, AudioConfig, AudioPayloader};

const RTP_HEADER_SIZE: usize = 12;

fn config(encrypt: bool) -> AudioConfig {
    AudioConfig { packet_duration: 5, encrypt, aes_key: *b"0123456789012345", aes_iv: *b"12345678" }
}

/// Mirrors `crate::iv::derive_iv`, which integration tests can't reach
/// directly since `iv` is a private module.
fn derive_iv(seed_value: u32, sequence: u32) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[0..4].copy_from_slice(&seed_value.wrapping_add(sequence).to_be_bytes());
    iv
}

#[test]
fn four_packets_close_one_block_emitting_six_shards_total() {
    let mut payloader = AudioPayloader::new(config(true)).unwrap();
    let mut total = 0;
    for packet in [b"p0".as_slice(), b"p1".as_slice(), b"p2".as_slice(), b"p3".as_slice()] {
        total += payloader.push_packet(packet).unwrap().len();
    }
    assert_eq!(total, AUDIO_TOTAL_SHARDS);
}

#[test]
fn timestamps_advance_by_five_per_payload_shard() {
    let mut payloader = AudioPayloader::new(config(false)).unwrap();
    for k in 0..AUDIO_DATA_SHARDS {
        let shards = payloader.push_packet(b"packet").unwrap();
        let timestamp = u32::from_be_bytes(shards[0][4..8].try_into().unwrap());
        assert_eq!(timestamp, 5 * k as u32);
    }
}

#[test]
fn unencrypted_payload_round_trips_as_plaintext() {
    let mut payloader = AudioPayloader::new(config(false)).unwrap();
    let shards = payloader.push_packet(b"plain opus bytes").unwrap();
    assert_eq!(&shards[0][RTP_HEADER_SIZE..], b"plain opus bytes");
}

#[test]
fn encrypted_payload_decrypts_with_the_sequence_derived_iv() {
    let mut payloader = AudioPayloader::new(config(true)).unwrap();
    let shards = payloader.push_packet(b"secret opus bytes!").unwrap();

    let iv = derive_iv(12_345_678, 0);
    let key = config(true).aes_key;
    let mut buffer = shards[0][RTP_HEADER_SIZE..].to_vec();
    let plaintext =
        cbc::Decryptor::<aes::Aes128>::new((&key).into(), (&iv).into()).decrypt_padded_mut::<block_padding::Pkcs7>(&mut buffer).unwrap();
    assert_eq!(plaintext, b"secret opus bytes!");
}

#[test]
fn fec_block_survives_any_single_erasure() {
    let mut payloader = AudioPayloader::new(config(true)).unwrap();
    let mut all = Vec::new();
    for packet in [b"one".as_slice(), b"two".as_slice(), b"three!".as_slice(), b"four!!".as_slice()] {
        all.extend(payloader.push_packet(packet).unwrap());
    }

    // The codeword covers payload bytes only; the RTP header is framed
    // separately and is never part of it.
    let payloads: Vec<&[u8]> = all.iter().map(|shard| &shard[RTP_HEADER_SIZE..]).collect();
    let shard_len = payloads.iter().map(|payload| payload.len()).max().unwrap();
    for erased_index in 0..payloads.len() {
        let mut padded: Vec<Option<Vec<u8>>> = payloads
            .iter()
            .map(|payload| {
                let mut payload = payload.to_vec();
                payload.resize(shard_len, 0);
                Some(payload)
            })
            .collect();
        let original = padded[erased_index].clone().unwrap();
        padded[erased_index] = None;

        fec::reconstruct(AUDIO_DATA_SHARDS, AUDIO_PARITY_SHARDS, &mut padded).unwrap();
        assert_eq!(padded[erased_index].as_ref().unwrap(), &original);
    }
}
