use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{BiometricError, BiometricResult};
use crate::vector::{BiometricVector, EMBEDDING_DIM};

// AES-256-GCM sealing of biometric vectors.
//
// The sealed form is the opaque string handed to the user store:
// hex(nonce || ciphertext), with the GCM tag inside the ciphertext. The
// plaintext is the 128 components as little-endian f64 — a fixed 1024-byte
// frame, length-checked on unseal. Decrypted bytes are parsed strictly as
// that frame and re-validated; they are never interpreted any other way.

const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size
const FRAME_SIZE: usize = EMBEDDING_DIM * 8;

pub type SealingKey = Zeroizing<[u8; 32]>;

/// Derive the vector sealing key from a configured secret.
pub fn derive_sealing_key(secret: &str) -> SealingKey {
    let digest = Sha256::digest(secret.as_bytes());
    Zeroizing::new(digest.into())
}

/// Seal a vector into an opaque hex string.
pub fn seal_vector(key: &SealingKey, vector: &BiometricVector) -> BiometricResult<String> {
    let cipher = Aes256Gcm::new_from_slice(&**key).map_err(|_| BiometricError::Encryption)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = AesNonce::from_slice(&nonce_bytes);

    let mut frame = Vec::with_capacity(FRAME_SIZE);
    for component in vector.as_slice() {
        frame.extend_from_slice(&component.to_le_bytes());
    }

    let ciphertext = cipher
        .encrypt(nonce, frame.as_slice())
        .map_err(|_| BiometricError::Encryption)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

/// Unseal an opaque hex string back into a validated vector.
pub fn unseal_vector(key: &SealingKey, sealed: &str) -> BiometricResult<BiometricVector> {
    let bytes = hex::decode(sealed).map_err(|_| BiometricError::MalformedCiphertext)?;
    if bytes.len() <= NONCE_SIZE {
        return Err(BiometricError::MalformedCiphertext);
    }
    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

    let cipher = Aes256Gcm::new_from_slice(&**key).map_err(|_| BiometricError::Decryption)?;
    let nonce = AesNonce::from_slice(nonce_bytes);

    let frame = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| BiometricError::Decryption)?;

    if frame.len() != FRAME_SIZE {
        return Err(BiometricError::MalformedCiphertext);
    }

    let mut values = Vec::with_capacity(EMBEDDING_DIM);
    for chunk in frame.chunks_exact(8) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        values.push(f64::from_le_bytes(buf));
    }

    BiometricVector::new(values)
}
