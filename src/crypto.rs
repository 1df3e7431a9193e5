//! AES-128-CBC encryption for audio payloads.

use aes::cipher::{BlockEncryptMut, KeyIvInit};
use block_padding::Pkcs7;

use crate::error::PayloadError;

type Encryptor = cbc::Encryptor<aes::Aes128>;

/// Encrypts `plaintext` with AES-128-CBC and PKCS#7 padding.
///
/// `key` and `iv` must each be 16 bytes. Returns [`PayloadError::CryptoFailure`]
/// if either is the wrong length.
pub fn encrypt_cbc(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let key: &[u8; 16] = key
        .try_into()
        .map_err(|_| PayloadError::CryptoFailure(format!("key must be 16 bytes, got {}", key.len())))?;
    let iv: &[u8; 16] = iv
        .try_into()
        .map_err(|_| PayloadError::CryptoFailure(format!("iv must be 16 bytes, got {}", iv.len())))?;

    let mut buffer = vec![0u8; plaintext.len() + 16];
    let plaintext_len = plaintext.len();
    buffer[..plaintext_len].copy_from_slice(plaintext);

    let ciphertext_len = Encryptor::new(key.into(), iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext_len)
        .map_err(|err| PayloadError::CryptoFailure(format!("padding error: {err:?}")))?
        .len();
    buffer.truncate(ciphertext_len);
    Ok(buffer)
}
