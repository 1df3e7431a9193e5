//! Reed-Solomon forward error correction over fixed-size shards.

use reed_solomon_erasure::galois_8::Field;
use reed_solomon_erasure::ReedSolomon;

use crate::error::PayloadError;

/// One-time initialization hook for the erasure-code backend.
///
/// The `reed-solomon-erasure` crate used here builds its Galois field tables
/// as compile-time constants and needs no runtime setup, but callers should
/// still invoke this once before constructing any payloader: it is the
/// stable call site to keep if the backend is ever swapped for one that does
/// need it.
pub fn init() {
    tracing::debug!("fec backend ready (no runtime initialization required)");
}

/// Fills the parity region of `shards` (`shards[data_shard_count..]`) from
/// the data region (`shards[..data_shard_count]`). Every shard must already
/// be the same length.
pub fn encode(data_shard_count: usize, parity_shard_count: usize, shards: &mut [Vec<u8>]) -> Result<(), PayloadError> {
    let encoder = ReedSolomon::<Field>::new(data_shard_count, parity_shard_count)
        .map_err(|err| PayloadError::CryptoFailure(format!("reed-solomon setup failed: {err}")))?;
    encoder
        .encode(shards)
        .map_err(|err| PayloadError::CryptoFailure(format!("reed-solomon encode failed: {err}")))
}

/// Repairs erased shards in place. `shards[i]` is `None` for an erased shard
/// and `Some(bytes)` otherwise; on success every entry is `Some`.
///
/// Returns [`PayloadError::UnrecoverableLoss`] if more shards are erased than
/// `parity_shard_count` can repair.
pub fn reconstruct(
    data_shard_count: usize,
    parity_shard_count: usize,
    shards: &mut [Option<Vec<u8>>],
) -> Result<(), PayloadError> {
    let lost = shards.iter().filter(|shard| shard.is_none()).count();
    if lost > parity_shard_count {
        return Err(PayloadError::UnrecoverableLoss { lost, parity: parity_shard_count });
    }

    let decoder = ReedSolomon::<Field>::new(data_shard_count, parity_shard_count)
        .map_err(|err| PayloadError::CryptoFailure(format!("reed-solomon setup failed: {err}")))?;
    decoder
        .reconstruct(shards)
        .map_err(|err| PayloadError::CryptoFailure(format!("reed-solomon reconstruct failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_single_erasure() {
        let shard_len = 8;
        let mut shards: Vec<Vec<u8>> = vec![
            vec![1u8; shard_len],
            vec![2u8; shard_len],
            vec![3u8; shard_len],
            vec![0u8; shard_len],
            vec![0u8; shard_len],
        ];
        encode(3, 2, &mut shards).unwrap();

        let original = shards[1].clone();
        let mut with_erasure: Vec<Option<Vec<u8>>> = shards.into_iter().map(Some).collect();
        with_erasure[1] = None;

        reconstruct(3, 2, &mut with_erasure).unwrap();
        assert_eq!(with_erasure[1].as_ref().unwrap(), &original);
    }

    #[test]
    fn reports_unrecoverable_loss() {
        let mut shards: Vec<Option<Vec<u8>>> = vec![Some(vec![0u8; 4]), None, None, Some(vec![0u8; 4])];
        let err = reconstruct(2, 1, &mut shards).unwrap_err();
        assert!(matches!(err, PayloadError::UnrecoverableLoss { lost: 2, parity: 1 }));
    }
}
