//! Encrypts Opus packets and frames them into RTP/Moonlight shards,
//! accumulating fixed-size Reed-Solomon blocks across packets.

use serde::{Deserialize, Serialize};

use crate::bytes::shard_buffer;
use crate::crypto::encrypt_cbc;
use crate::error::PayloadError;
use crate::fec;
use crate::iv::{derive_iv, parse_seed};
use crate::rtp::{RtpHeader, AUDIO_PACKET_TYPE, RTP_HEADER_SIZE};

pub const AUDIO_DATA_SHARDS: usize = 4;
pub const AUDIO_PARITY_SHARDS: usize = 2;
pub const AUDIO_TOTAL_SHARDS: usize = AUDIO_DATA_SHARDS + AUDIO_PARITY_SHARDS;

/// Hard ceiling on one payload's encrypted/plaintext size, matching the
/// reference encoder's fixed FEC shard capacity (`((2048 + 15) / 16) * 16`).
const AUDIO_MAX_SHARD_PAYLOAD: usize = 2048;

/// Per-stream configuration for [`AudioPayloader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Milliseconds of audio per packet.
    pub packet_duration: u32,
    /// Whether payloads are encrypted before framing.
    pub encrypt: bool,
    /// AES-128 key.
    pub aes_key: [u8; 16],
    /// IV seed, negotiated as an ASCII decimal numeral (§4.1).
    pub aes_iv: [u8; 8],
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { packet_duration: 5, encrypt: true, aes_key: [0u8; 16], aes_iv: *b"00000000" }
    }
}

/// Converts encoded Opus packets into ordered RTP/Moonlight shard lists.
pub struct AudioPayloader {
    config: AudioConfig,
    iv_seed: u32,
    rtp_sequence_number: u16,
    rtp_timestamp: u32,
    block: Vec<Vec<u8>>,
    fec_block_number: u32,
}

impl AudioPayloader {
    pub fn new(config: AudioConfig) -> Result<Self, PayloadError> {
        let iv_seed = parse_seed(&config.aes_iv)?;
        Ok(Self {
            config,
            iv_seed,
            rtp_sequence_number: 0,
            rtp_timestamp: 0,
            block: Vec::with_capacity(AUDIO_DATA_SHARDS),
            fec_block_number: 0,
        })
    }

    /// Encrypts (if configured), frames, and accumulates one audio packet.
    ///
    /// Returns one shard normally, or `1 + AUDIO_PARITY_SHARDS` shards when
    /// this call closes a FEC block.
    pub fn push_packet(&mut self, packet: &[u8]) -> Result<Vec<Vec<u8>>, PayloadError> {
        let payload = if self.config.encrypt {
            let iv = derive_iv(self.iv_seed, self.rtp_sequence_number as u32);
            encrypt_cbc(packet, &self.config.aes_key, &iv)?
        } else {
            packet.to_vec()
        };
        if payload.len() > AUDIO_MAX_SHARD_PAYLOAD {
            return Err(PayloadError::OversizedPayload { actual: payload.len(), limit: AUDIO_MAX_SHARD_PAYLOAD });
        }

        let mut shard = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());
        RtpHeader::new(AUDIO_PACKET_TYPE, self.rtp_sequence_number, self.rtp_timestamp).serialize(&mut shard);
        shard.extend_from_slice(&payload);

        let mut out = vec![shard];
        self.block.push(payload);

        self.rtp_sequence_number = self.rtp_sequence_number.wrapping_add(1);
        self.rtp_timestamp = self.rtp_timestamp.wrapping_add(5);

        if self.block.len() == AUDIO_DATA_SHARDS {
            match self.encode_block() {
                Ok(mut parity) => out.append(&mut parity),
                Err(err) => {
                    tracing::warn!(fec_block_number = self.fec_block_number, %err, "dropping audio FEC block");
                    self.block.clear();
                    return Err(err);
                }
            }
            self.block.clear();
            self.fec_block_number = self.fec_block_number.wrapping_add(1);
        }

        Ok(out)
    }

    /// Runs Reed-Solomon `encode` over the block's payload bytes only — the
    /// RTP header is never part of the codeword — and prepends a fresh RTP
    /// header (continuing sequence number, last data shard's timestamp) to
    /// each resulting parity payload.
    fn encode_block(&mut self) -> Result<Vec<Vec<u8>>, PayloadError> {
        let shard_len = self.block.iter().map(Vec::len).max().unwrap_or(0);
        let mut shards: Vec<Vec<u8>> = self
            .block
            .iter()
            .map(|payload| {
                let mut padded = payload.clone();
                padded.resize(shard_len, 0);
                padded
            })
            .collect();
        for _ in 0..AUDIO_PARITY_SHARDS {
            shards.push(shard_buffer(shard_len));
        }
        fec::encode(AUDIO_DATA_SHARDS, AUDIO_PARITY_SHARDS, &mut shards)?;

        let last_data_timestamp = self.rtp_timestamp.wrapping_sub(5);
        let mut parity_shards = Vec::with_capacity(AUDIO_PARITY_SHARDS);
        for payload in shards.into_iter().skip(AUDIO_DATA_SHARDS) {
            let mut shard = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());
            RtpHeader::new(AUDIO_PACKET_TYPE, self.rtp_sequence_number, last_data_timestamp).serialize(&mut shard);
            shard.extend_from_slice(&payload);
            self.rtp_sequence_number = self.rtp_sequence_number.wrapping_add(1);
            parity_shards.push(shard);
        }
        Ok(parity_shards)
    }
}
