//! Per-packet IV derivation for audio encryption.
//!
//! The stream's `aes_iv` seed is negotiated over RTSP as an up-to-8-digit
//! decimal numeral (the convention this protocol's reference client and host
//! use for the `aesiv` parameter). [`parse_seed`] turns that ASCII text into
//! the `u32` that [`derive_iv`] then combines with the packet sequence
//! number.

use crate::bytes::write_u32_be_at;
use crate::error::PayloadError;

/// Parses an 8-byte ASCII decimal `aes_iv` seed into its numeric value.
///
/// Called once at payloader construction; the resulting `u32` is what
/// [`derive_iv`] actually operates on, so the hot path never re-parses text.
pub fn parse_seed(seed: &[u8]) -> Result<u32, PayloadError> {
    let text = std::str::from_utf8(seed)
        .map_err(|_| PayloadError::ConfigurationInvalid("aes_iv seed is not valid UTF-8".into()))?;
    text.trim_end_matches('\0')
        .parse::<u32>()
        .map_err(|_| PayloadError::ConfigurationInvalid(format!("aes_iv seed {text:?} is not a decimal numeral")))
}

/// Derives the 16-byte CBC IV for sequence number `sequence` given the
/// stream's numeric IV seed.
///
/// `seed_value + sequence` (wrapping) is stored big-endian into the first 4
/// bytes of an otherwise-zeroed 16-byte buffer.
pub fn derive_iv(seed_value: u32, sequence: u32) -> [u8; 16] {
    let mut iv = [0u8; 16];
    write_u32_be_at(&mut iv, 0, seed_value.wrapping_add(sequence));
    iv
}
