// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Reversible card-number encryption.
//!
//! AES-256-ECB with PKCS#7 padding, base64 tokens. ECB is chosen on purpose:
//! the scheme must be **deterministic** — the same card number always
//! produces the same token — because card-number uniqueness is enforced by
//! an indexed comparison of stored ciphertext. The trade-off is that equal
//! plaintexts are distinguishable as equal without the key; that leak is
//! accepted and confined to 16-digit card numbers, never free-form data.
//!
//! The 32-byte key is the SHA-256 digest of the configured secret and is
//! provisioned once at process start. Decryption failures mean the stored
//! ciphertext or the key is wrong — corrupted state, not a business error —
//! and the error values deliberately carry no payload.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::Aes256;
use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// Failure while decrypting a stored token.
///
/// Variants are deliberately payload-free: a cipher failure must never echo
/// ciphertext or plaintext into logs or error chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Token is not valid base64.
    #[error("stored token is not valid base64")]
    Encoding,
    /// Padding check failed: wrong key or tampered ciphertext.
    #[error("stored token does not decrypt under the provisioned key")]
    Corrupted,
    /// Decrypted bytes are not UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    Payload,
}

/// Deterministic symmetric cipher for card numbers.
#[derive(Clone)]
pub struct CardNumberCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for CardNumberCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes stay out of Debug output.
        f.debug_struct("CardNumberCipher").finish_non_exhaustive()
    }
}

impl CardNumberCipher {
    /// Derive the cipher from the configured secret.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self { key: digest.into() }
    }

    /// Encrypt a plain card number into a storable token.
    ///
    /// Deterministic: equal inputs yield equal tokens.
    pub fn encrypt(&self, plain_number: &str) -> String {
        let ciphertext = Aes256EcbEnc::new(&self.key.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plain_number.as_bytes());
        Base64::encode_string(&ciphertext)
    }

    /// Decrypt a stored token back into the plain card number.
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let ciphertext = Base64::decode_vec(token).map_err(|_| CipherError::Encoding)?;
        let plain = Aes256EcbDec::new(&self.key.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::Corrupted)?;
        String::from_utf8(plain).map_err(|_| CipherError::Payload)
    }
}
