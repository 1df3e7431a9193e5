//! Fragments an encoded video frame into RTP/Moonlight shards protected by
//! Reed-Solomon FEC.

pub mod header;

use serde::{Deserialize, Serialize};

use crate::bytes::shard_buffer;
use crate::error::PayloadError;
use crate::fec;
use crate::rtp::{RtpHeader, RTP_HEADER_SIZE, VIDEO_PACKET_TYPE};
use header::{fec_info, flag, MOONLIGHT_VIDEO_HEADER_SIZE, MULTI_FEC_FLAGS, VIDEO_PAYLOAD_MARKER};

/// Hard ceiling the erasure-code backend and the wire format both impose on
/// shards in a single FEC block.
const MAX_SHARDS: usize = 255;

/// Multi-block video FEC never splits into more than this many blocks; a
/// frame too large for that is folded, unprotected, into the last one (§4.5).
const MAX_BLOCKS: usize = 4;

/// Per-stream configuration for [`VideoPayloader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Target bytes of RTP payload per shard, i.e. everything after the
    /// 12-byte RTP header (including the 16-byte Moonlight header).
    pub payload_size: usize,
    /// Configured FEC redundancy, 0..=100.
    pub fec_percentage: u32,
    /// Floor on parity shards per block regardless of `fec_percentage`.
    pub min_required_fec_packets: usize,
    /// Whether the last fragment of a frame is zero-padded to full shard size.
    pub add_padding: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self { payload_size: 1024, fec_percentage: 20, min_required_fec_packets: 2, add_padding: true }
    }
}

/// Converts encoded frames into ordered RTP/Moonlight shard lists.
///
/// One instance per video stream; not `Sync` across streams sharing state.
pub struct VideoPayloader {
    config: VideoConfig,
    shard_payload_size: usize,
    frame_index: u32,
    stream_packet_index: u32,
    rtp_sequence_number: u16,
}

impl VideoPayloader {
    pub fn new(config: VideoConfig) -> Result<Self, PayloadError> {
        if config.payload_size <= MOONLIGHT_VIDEO_HEADER_SIZE {
            return Err(PayloadError::ConfigurationInvalid(format!(
                "payload_size must exceed the {MOONLIGHT_VIDEO_HEADER_SIZE}-byte Moonlight header, got {}",
                config.payload_size
            )));
        }
        if config.fec_percentage > 100 {
            return Err(PayloadError::ConfigurationInvalid(format!(
                "fec_percentage must be 0..=100, got {}",
                config.fec_percentage
            )));
        }
        let shard_payload_size = config.payload_size - MOONLIGHT_VIDEO_HEADER_SIZE;
        Ok(Self { config, shard_payload_size, frame_index: 0, stream_packet_index: 0, rtp_sequence_number: 0 })
    }

    /// Data shards a single FEC block may hold before a frame must be split
    /// across multiple blocks.
    fn data_shards_per_block(&self) -> usize {
        let fec_percentage = self.config.fec_percentage as usize;
        let parity_shards_per_block = (MAX_SHARDS * fec_percentage) / (100 + fec_percentage);
        MAX_SHARDS - parity_shards_per_block
    }

    pub fn push_frame(&mut self, frame: &[u8]) -> Result<Vec<Vec<u8>>, PayloadError> {
        let mut framed = Vec::with_capacity(VIDEO_PAYLOAD_MARKER.len() + frame.len());
        framed.extend_from_slice(&VIDEO_PAYLOAD_MARKER);
        framed.extend_from_slice(frame);

        let fragments = self.fragment(&framed);
        let data_shards_per_block = self.data_shards_per_block();

        let result = if fragments.len() <= data_shards_per_block {
            self.emit_block(fragments, 0, 0, false, false)
        } else {
            self.emit_multi_block(fragments, data_shards_per_block)
        };

        if result.is_err() {
            tracing::warn!(frame_index = self.frame_index, "dropping video frame after FEC failure");
        }
        self.frame_index = self.frame_index.wrapping_add(1);
        result
    }

    fn fragment(&self, framed: &[u8]) -> Vec<Vec<u8>> {
        let shard_len = self.shard_payload_size;
        let mut fragments = Vec::with_capacity(framed.len().div_ceil(shard_len.max(1)).max(1));
        let mut offset = 0;
        while offset < framed.len() {
            let end = (offset + shard_len).min(framed.len());
            let mut fragment = framed[offset..end].to_vec();
            if fragment.len() < shard_len && self.config.add_padding {
                fragment.resize(shard_len, 0);
            }
            fragments.push(fragment);
            offset = end;
        }
        if fragments.is_empty() {
            let len = if self.config.add_padding { shard_len } else { 0 };
            fragments.push(vec![0u8; len]);
        }
        fragments
    }

    /// Splits `fragments` into blocks of at most `per_block` data shards,
    /// capped at [`MAX_BLOCKS`]; anything beyond the cap is folded,
    /// unprotected, into the final block.
    fn emit_multi_block(&mut self, fragments: Vec<Vec<u8>>, per_block: usize) -> Result<Vec<Vec<u8>>, PayloadError> {
        let per_block = per_block.max(1);
        let mut blocks: Vec<Vec<Vec<u8>>> = fragments.chunks(per_block).map(|chunk| chunk.to_vec()).collect();

        let mut overflowed = false;
        if blocks.len() > MAX_BLOCKS {
            overflowed = true;
            let mut overflow = Vec::new();
            while blocks.len() > MAX_BLOCKS {
                overflow.extend(blocks.pop().expect("len > MAX_BLOCKS"));
            }
            blocks[MAX_BLOCKS - 1].extend(overflow);
        }

        let last_block_index = (blocks.len().min(MAX_BLOCKS) - 1) as u8;
        let mut shards = Vec::new();
        for (index, block_fragments) in blocks.into_iter().enumerate() {
            let unprotected = overflowed && index == last_block_index as usize;
            let mut block_shards = self.emit_block(block_fragments, index as u8, last_block_index, unprotected, true)?;
            shards.append(&mut block_shards);
        }
        Ok(shards)
    }

    /// Builds and FEC-protects one block's worth of data fragments.
    ///
    /// The Reed-Solomon codeword covers the payload region only — never the
    /// RTP/Moonlight header bytes, which differ per shard in ways the
    /// erasure code knows nothing about. Every data fragment is padded to
    /// `shard_payload_size` for the codeword regardless of `add_padding`
    /// (which only controls what goes out on the wire); parity payloads are
    /// framed with a freshly built header afterward, exactly like a data
    /// shard, instead of overwriting bytes the encoder produced for that
    /// region.
    fn emit_block(
        &mut self,
        fragments: Vec<Vec<u8>>,
        block_index: u8,
        last_block_index: u8,
        unprotected: bool,
        multi_block: bool,
    ) -> Result<Vec<Vec<u8>>, PayloadError> {
        let data_count = fragments.len();
        let parity_count = self.parity_count(data_count, block_index, last_block_index, unprotected, multi_block);
        let effective_fec_percentage = if data_count > 0 { (parity_count * 100 / data_count) as u32 } else { 0 };
        let multi_fec_blocks = (block_index << 4) | last_block_index;

        if data_count + parity_count > MAX_SHARDS {
            return Err(PayloadError::ConfigurationInvalid(format!(
                "block of {data_count} data + {parity_count} parity shards exceeds {MAX_SHARDS}"
            )));
        }

        let mut parity_payloads = if parity_count > 0 {
            let mut codeword: Vec<Vec<u8>> = fragments
                .iter()
                .map(|fragment| {
                    let mut padded = fragment.clone();
                    padded.resize(self.shard_payload_size, 0);
                    padded
                })
                .collect();
            for _ in 0..parity_count {
                codeword.push(shard_buffer(self.shard_payload_size));
            }
            fec::encode(data_count, parity_count, &mut codeword)?;
            codeword.split_off(data_count)
        } else {
            Vec::new()
        };

        let mut shards = Vec::with_capacity(data_count + parity_count);
        for (i, fragment) in fragments.into_iter().enumerate() {
            let flags = shard_flags(i, data_count);
            let stream_packet_index = self.stream_packet_index.wrapping_add((i as u32).wrapping_mul(0x100));
            let fec_info_value = fec_info(i as u32, data_count as u32, effective_fec_percentage);
            shards.push(self.build_data_shard(fragment, flags, stream_packet_index, fec_info_value, multi_fec_blocks));
        }
        self.stream_packet_index = self.stream_packet_index.wrapping_add((data_count as u32).wrapping_mul(0x100));

        for (offset, payload) in parity_payloads.drain(..).enumerate() {
            let shard_index = data_count + offset;
            let fec_info_value = fec_info(shard_index as u32, data_count as u32, effective_fec_percentage);
            shards.push(self.build_parity_shard(payload, fec_info_value, multi_fec_blocks));
        }

        Ok(shards)
    }

    /// `multi_block` gates the reference encoder's "last block emits one
    /// fewer parity shard" quirk (§4.5): it only applies when the frame was
    /// actually split across blocks, never on the single-block fast path.
    fn parity_count(
        &self,
        data_count: usize,
        block_index: u8,
        last_block_index: u8,
        unprotected: bool,
        multi_block: bool,
    ) -> usize {
        if data_count == 0 || unprotected {
            return 0;
        }
        let naive = (data_count * self.config.fec_percentage as usize)
            .div_ceil(100)
            .max(self.config.min_required_fec_packets);
        let mut parity = naive.min(MAX_SHARDS - data_count);
        if multi_block && block_index == last_block_index {
            parity = parity.saturating_sub(1);
        }
        parity
    }

    fn build_data_shard(
        &mut self,
        payload: Vec<u8>,
        flags: u8,
        stream_packet_index: u32,
        fec_info_value: u32,
        multi_fec_blocks: u8,
    ) -> Vec<u8> {
        let mut shard = Vec::with_capacity(RTP_HEADER_SIZE + self.config.payload_size);
        RtpHeader::new(VIDEO_PACKET_TYPE, self.rtp_sequence_number, 0).serialize(&mut shard);
        self.rtp_sequence_number = self.rtp_sequence_number.wrapping_add(1);

        write_u32_le_at_end(&mut shard, stream_packet_index);
        write_u32_le_at_end(&mut shard, self.frame_index);
        shard.push(flags);
        shard.push(0);
        shard.push(MULTI_FEC_FLAGS);
        shard.push(multi_fec_blocks);
        write_u32_le_at_end(&mut shard, fec_info_value);

        shard.extend_from_slice(&payload);
        shard
    }

    /// Frames one FEC-computed parity payload with its own fresh RTP and
    /// Moonlight header, the same way [`Self::build_data_shard`] frames a
    /// data fragment. `streamPacketIndex` has no meaningful value for a
    /// parity shard, so it is left at zero.
    fn build_parity_shard(&mut self, payload: Vec<u8>, fec_info_value: u32, multi_fec_blocks: u8) -> Vec<u8> {
        self.build_data_shard(payload, flag::CONTAINS_PIC_DATA, 0, fec_info_value, multi_fec_blocks)
    }
}

fn shard_flags(index: usize, data_count: usize) -> u8 {
    let mut flags = flag::CONTAINS_PIC_DATA;
    if index == 0 {
        flags |= flag::START_OF_FRAME;
    }
    if index == data_count - 1 {
        flags |= flag::END_OF_FRAME;
    }
    flags
}

fn write_u32_le_at_end(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}
