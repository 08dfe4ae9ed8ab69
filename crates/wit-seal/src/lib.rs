//! Envelope encryption.
//!
//! Each protected file gets a fresh random data-encryption key (DEK) and
//! nonce at push time. The bytes are encrypted with XChaCha20-Poly1305; the
//! DEK is sealed by the external policy service under the repository's
//! access policy and travels with the file's metadata as an
//! [`EncryptionEnvelope`].
//!
//! A fresh DEK per push means revoking a collaborator and pushing again
//! rotates the key for every file touched by that push. Sealed keys issued
//! for unchanged files remain valid: revocation is forward-only, not
//! retroactive.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use wit_remote::{PolicyClient, PolicyProof, RemoteError};
use wit_types::EncryptionEnvelope;

/// DEK length in bytes.
pub const KEY_LEN: usize = 32;
/// XChaCha20 nonce length.
pub const NONCE_LEN: usize = 24;
/// Poly1305 authentication tag length.
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum SealError {
    /// The ciphertext was tampered with or the key is wrong.
    #[error("authentication failed: ciphertext tampered or wrong key")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    BadEnvelope(String),

    #[error(transparent)]
    Policy(#[from] RemoteError),
}

pub type SealResult<T> = Result<T, SealError>;

/// A file encrypted and ready for upload.
pub struct SealedFile {
    pub ciphertext: Vec<u8>,
    pub envelope: EncryptionEnvelope,
}

/// Generate a fresh random DEK.
pub fn generate_dek() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

fn cipher(dek: &[u8]) -> SealResult<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(dek)
        .map_err(|_| SealError::BadEnvelope(format!("DEK must be {KEY_LEN} bytes")))
}

/// Encrypt plaintext under a DEK with a fresh nonce; tag is detached.
pub fn encrypt(dek: &[u8; KEY_LEN], plaintext: &[u8]) -> SealResult<(Vec<u8>, [u8; NONCE_LEN], [u8; TAG_LEN])> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    // The AEAD appends the tag; split it off so the envelope carries it
    // separately from the ciphertext.
    let mut combined = cipher(dek)?
        .encrypt(nonce, plaintext)
        .map_err(|_| SealError::AuthenticationFailed)?;
    let tag_start = combined.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&combined[tag_start..]);
    combined.truncate(tag_start);
    Ok((combined, nonce_bytes, tag))
}

/// Decrypt ciphertext with the DEK, nonce, and detached tag.
pub fn decrypt(
    dek: &[u8],
    nonce: &[u8],
    auth_tag: &[u8],
    ciphertext: &[u8],
) -> SealResult<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(SealError::BadEnvelope(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    if auth_tag.len() != TAG_LEN {
        return Err(SealError::BadEnvelope(format!(
            "auth tag must be {TAG_LEN} bytes, got {}",
            auth_tag.len()
        )));
    }
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(auth_tag);
    cipher(dek)?
        .decrypt(XNonce::from_slice(nonce), combined.as_ref())
        .map_err(|_| SealError::AuthenticationFailed)
}

/// Encrypt a file for upload: fresh DEK, fresh nonce, DEK sealed under the
/// repository's policy.
pub async fn seal_file(
    policy: &dyn PolicyClient,
    policy_id: &str,
    plaintext: &[u8],
) -> SealResult<SealedFile> {
    let dek = generate_dek();
    let (ciphertext, nonce, auth_tag) = encrypt(&dek, plaintext)?;
    let sealed_key = policy.seal_key(policy_id, &dek).await?;
    Ok(SealedFile {
        ciphertext,
        envelope: EncryptionEnvelope {
            sealed_key,
            nonce: nonce.to_vec(),
            auth_tag: auth_tag.to_vec(),
            policy_id: policy_id.to_string(),
        },
    })
}

/// Decrypt a downloaded file: satisfy the policy to unseal the DEK, then
/// open locally with the envelope's nonce and tag.
pub async fn open_file(
    policy: &dyn PolicyClient,
    proof: &PolicyProof,
    envelope: &EncryptionEnvelope,
    ciphertext: &[u8],
) -> SealResult<Vec<u8>> {
    let dek = policy.unseal_key(&envelope.sealed_key, proof).await?;
    decrypt(&dek, &envelope.nonce, &envelope.auth_tag, ciphertext)
}
