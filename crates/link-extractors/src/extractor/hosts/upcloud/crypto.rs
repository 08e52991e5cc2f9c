use aes::Aes256;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};

use crate::error::ExtractorError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

const SALTED_MAGIC: &[u8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// OpenSSL `EVP_BytesToKey` with MD5 and one iteration.
pub(crate) fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut derived = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut block: Vec<u8> = Vec::new();
    while derived.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(passphrase);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        derived.extend_from_slice(&block);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&derived[..KEY_LEN]);
    iv.copy_from_slice(&derived[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}

/// Decrypts a base64 `Salted__` payload (the CryptoJS passphrase format).
pub(crate) fn decrypt_salted(payload: &str, passphrase: &str) -> Result<Vec<u8>, ExtractorError> {
    let data = BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| ExtractorError::Decryption(format!("payload is not base64: {e}")))?;

    let body = data
        .strip_prefix(SALTED_MAGIC)
        .filter(|rest| rest.len() > SALT_LEN)
        .ok_or_else(|| ExtractorError::Decryption("missing Salted__ header".to_string()))?;
    let (salt, ciphertext) = body.split_at(SALT_LEN);
    if ciphertext.len() % 16 != 0 {
        return Err(ExtractorError::Decryption(format!(
            "ciphertext length {} is not a multiple of the block size",
            ciphertext.len()
        )));
    }

    let (key, iv) = evp_bytes_to_key(passphrase.as_bytes(), salt);
    let cipher = Aes256CbcDec::new_from_slices(&key, &iv).map_err(|e| {
        ExtractorError::Decryption(format!("Failed to initialize AES decryptor: {e}"))
    })?;

    let mut buffer = ciphertext.to_vec();
    let plain_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|e| ExtractorError::Decryption(format!("Decryption failed: {e}")))?
        .len();
    buffer.truncate(plain_len);
    Ok(buffer)
}
