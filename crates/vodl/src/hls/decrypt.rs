use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};

use super::playlist::KeyMethod;
use crate::error::{VodlError, VodlResult};

/// IV used by the origin: four big-endian 32-bit words `(0, 0, 0, media_sequence)`.
///
/// The `IV` attribute of `#EXT-X-KEY` is never consulted.
pub fn derive_iv(media_sequence: u64) -> VodlResult<[u8; 16]> {
    let sequence = u32::try_from(media_sequence)
        .map_err(|_| VodlError::SequenceOutOfRange(media_sequence))?;

    let mut iv = [0u8; 16];
    iv[12..].copy_from_slice(&sequence.to_be_bytes());
    Ok(iv)
}

/// AES-128-CBC decryption of one segment.
///
/// No unpadding is performed, the plaintext has exactly the ciphertext length.
pub fn decrypt_segment(
    key: &[u8; 16],
    media_sequence: u64,
    ciphertext: &[u8],
) -> VodlResult<Vec<u8>> {
    let iv = derive_iv(media_sequence)?;
    cbc::Decryptor::<aes::Aes128>::new(key.into(), (&iv).into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| VodlError::Decrypt {
            media_sequence,
            len: ciphertext.len(),
        })
}

/// Raw key bytes together with the method they were declared with.
#[derive(Clone)]
pub struct SegmentKey {
    pub method: KeyMethod,
    key: [u8; 16],
}

impl SegmentKey {
    pub fn new(method: KeyMethod, uri: &str, bytes: &[u8]) -> VodlResult<Self> {
        let key = bytes.try_into().map_err(|_| VodlError::InvalidKeyLength {
            uri: uri.to_string(),
            len: bytes.len(),
        })?;
        Ok(Self { method, key })
    }

    pub fn decrypt_segment(&self, media_sequence: u64, ciphertext: &[u8]) -> VodlResult<Vec<u8>> {
        if self.method != KeyMethod::Aes128 {
            return Err(VodlError::UnsupportedKeyMethod(self.method.clone()));
        }
        decrypt_segment(&self.key, media_sequence, ciphertext)
    }
}

impl std::fmt::Debug for SegmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentKey")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
