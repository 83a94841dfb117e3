//! secp256k1 / SHA-256 ECDSA: key generation, key parsing, signing, and
//! verification.
//!
//! Signatures are the fixed-width `r || s` encoding (64 bytes), not DER —
//! there is exactly one wire format, so there is nothing for a caller to
//! get wrong. Nonces are RFC 6979 deterministic, and signatures are
//! normalized to low-s on the way out; `verify` accepts either s value,
//! since old signatures produced before normalization existed still have
//! to validate.

use elliptic_curve::generic_array::GenericArray;
use elliptic_curve::sec1::FromEncodedPoint;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};
use crate::secure_buffer::SecureBuffer;

/// A validated secp256k1 public key, held in its uncompressed SEC1 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    pub fn to_bytes65(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }
}

/// secp256k1 + SHA-256 key generation, parsing, signing, and verification.
pub struct EcdsaEngine;

impl EcdsaEngine {
    /// Draws a uniformly random scalar in `[1, n-1]` from the platform
    /// entropy source, rejection-sampling out-of-range draws.
    pub fn generate_private_key() -> CoreResult<SecureBuffer> {
        let mut buf = SecureBuffer::new(32);
        loop {
            OsRng
                .try_fill_bytes(buf.as_mut_slice())
                .map_err(|_| CoreError::EntropyUnavailable)?;
            if secp256k1::SecretKey::from_slice(buf.as_slice()).is_ok() {
                return Ok(buf);
            }
        }
    }

    /// Validates a 32-byte scalar and returns an owned copy.
    pub fn parse_private_key(bytes: &[u8]) -> CoreResult<SecureBuffer> {
        if bytes.len() != 32 {
            return Err(CoreError::BadKeyFormat);
        }
        secp256k1::SecretKey::from_slice(bytes).map_err(|_| CoreError::OutOfRange)?;
        Ok(SecureBuffer::from_bytes(bytes))
    }

    /// Returns the 32-byte big-endian encoding of a private key.
    pub fn serialize_private_key(private_key: &SecureBuffer) -> SecureBuffer {
        private_key.clone()
    }

    /// Parses a public key from its 65-byte uncompressed SEC1 encoding
    /// (`0x04 || X(32) || Y(32)`).
    pub fn parse_public_key(bytes: &[u8]) -> CoreResult<PublicKey> {
        if bytes.len() != 65 {
            return Err(CoreError::BadKeyFormat);
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(CoreError::IsIdentity);
        }
        if bytes[0] != 0x04 {
            return Err(CoreError::BadKeyFormat);
        }
        Self::parse_public_key_coordinates(&bytes[1..33], &bytes[33..65])
    }

    /// Parses a public key from raw 32-byte X and Y coordinates.
    pub fn parse_public_key_coordinates(x: &[u8], y: &[u8]) -> CoreResult<PublicKey> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CoreError::BadKeyFormat);
        }
        if x.iter().all(|&b| b == 0) && y.iter().all(|&b| b == 0) {
            return Err(CoreError::IsIdentity);
        }

        let x_arr = GenericArray::clone_from_slice(x);
        let y_arr = GenericArray::clone_from_slice(y);
        let encoded = k256::EncodedPoint::from_affine_coordinates(&x_arr, &y_arr, false);
        let on_curve: bool = k256::AffinePoint::from_encoded_point(&encoded).is_some().into();
        if !on_curve {
            return Err(CoreError::NotOnCurve);
        }

        let mut full = [0u8; 65];
        full[0] = 0x04;
        full[1..33].copy_from_slice(x);
        full[33..65].copy_from_slice(y);
        let key = secp256k1::PublicKey::from_slice(&full).map_err(|_| CoreError::NotOnCurve)?;
        Ok(PublicKey(key))
    }

    /// Returns the 65-byte uncompressed SEC1 encoding of a public key.
    pub fn serialize_public_key(public_key: &PublicKey) -> [u8; 65] {
        public_key.to_bytes65()
    }

    /// Computes `k * G` for a validated private key.
    pub fn compute_public_key(private_key: &SecureBuffer) -> CoreResult<PublicKey> {
        let secret_key =
            secp256k1::SecretKey::from_slice(private_key.as_slice()).map_err(|_| CoreError::OutOfRange)?;
        let secp = secp256k1::Secp256k1::new();
        Ok(PublicKey(secret_key.public_key(&secp)))
    }

    /// Reports whether `public_key` is `private_key`'s corresponding point.
    pub fn check_match(private_key: &SecureBuffer, public_key: &PublicKey) -> bool {
        match Self::compute_public_key(private_key) {
            Ok(computed) => computed == *public_key,
            Err(_) => false,
        }
    }

    /// Signs `message`'s SHA-256 digest, producing a 64-byte `r || s`
    /// signature with an RFC 6979 deterministic nonce and a normalized
    /// low-s value.
    pub fn sign(message: &[u8], private_key: &SecureBuffer) -> CoreResult<[u8; 64]> {
        let secret_key =
            secp256k1::SecretKey::from_slice(private_key.as_slice()).map_err(|_| CoreError::OutOfRange)?;
        let secp = secp256k1::Secp256k1::new();
        let digest = Sha256::digest(message);
        let msg = secp256k1::Message::from_digest_slice(&digest)
            .expect("SHA-256 digest is always 32 bytes");
        let signature = secp.sign_ecdsa(&msg, &secret_key);
        Ok(signature.serialize_compact())
    }

    /// Verifies a 64-byte `r || s` signature over `message`'s SHA-256
    /// digest. Any malformed input — wrong signature length, an
    /// unparseable public key, an out-of-range `r`/`s` — is reported as a
    /// plain `false` rather than an error.
    pub fn verify(message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
        if signature.len() != 64 {
            return false;
        }
        let secp = secp256k1::Secp256k1::new();
        let digest = Sha256::digest(message);
        let msg = match secp256k1::Message::from_digest_slice(&digest) {
            Ok(msg) => msg,
            Err(_) => return false,
        };
        let mut sig = match secp256k1::ecdsa::Signature::from_compact(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        // libsecp256k1 only accepts low-S signatures; a conforming signer may
        // still hand us a high-S one, so normalize before verifying.
        sig.normalize_s();
        secp.verify_ecdsa(&msg, &sig, &public_key.0).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_one_maps_to_the_generator_point() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let private_key = SecureBuffer::from_bytes(&one);
        let public_key = EcdsaEngine::compute_public_key(&private_key).unwrap();
        let encoded = EcdsaEngine::serialize_public_key(&public_key);

        let expected_x = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        let expected_y = "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
        assert_eq!(hex::encode(&encoded[1..33]), expected_x);
        assert_eq!(hex::encode(&encoded[33..65]), expected_y);
    }

    #[test]
    fn generate_parse_sign_verify_round_trip() {
        let private_key = EcdsaEngine::generate_private_key().unwrap();
        let public_key = EcdsaEngine::compute_public_key(&private_key).unwrap();
        assert!(EcdsaEngine::check_match(&private_key, &public_key));

        let message = b"settle 3 BTC to cold storage";
        let signature = EcdsaEngine::sign(message, &private_key).unwrap();
        assert!(EcdsaEngine::verify(message, &signature, &public_key));
    }

    #[test]
    fn signing_is_deterministic() {
        let mut scalar = [0u8; 32];
        scalar[31] = 7;
        let private_key = SecureBuffer::from_bytes(&scalar);
        let message = b"deterministic nonce check";
        let sig_a = EcdsaEngine::sign(message, &private_key).unwrap();
        let sig_b = EcdsaEngine::sign(message, &private_key).unwrap();
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn tampered_signature_fails_to_verify() {
        let private_key = EcdsaEngine::generate_private_key().unwrap();
        let public_key = EcdsaEngine::compute_public_key(&private_key).unwrap();
        let message = b"original message";
        let mut signature = EcdsaEngine::sign(message, &private_key).unwrap();
        signature[0] ^= 0xFF;
        assert!(!EcdsaEngine::verify(message, &signature, &public_key));
    }

    #[test]
    fn wrong_message_fails_to_verify() {
        let private_key = EcdsaEngine::generate_private_key().unwrap();
        let public_key = EcdsaEngine::compute_public_key(&private_key).unwrap();
        let signature = EcdsaEngine::sign(b"message a", &private_key).unwrap();
        assert!(!EcdsaEngine::verify(b"message b", &signature, &public_key));
    }

    #[test]
    fn parse_public_key_rejects_all_zero_identity_encoding() {
        let bytes = [0u8; 65];
        let err = EcdsaEngine::parse_public_key(&bytes).unwrap_err();
        assert!(err == CoreError::IsIdentity || err == CoreError::NotOnCurve);
    }

    #[test]
    fn parse_public_key_rejects_wrong_length() {
        let bytes = [0u8; 64];
        assert_eq!(
            EcdsaEngine::parse_public_key(&bytes).unwrap_err(),
            CoreError::BadKeyFormat
        );
    }

    #[test]
    fn parse_private_key_rejects_wrong_length() {
        assert_eq!(
            EcdsaEngine::parse_private_key(&[1u8; 31]).unwrap_err(),
            CoreError::BadKeyFormat
        );
    }

    #[test]
    fn parse_private_key_rejects_zero_scalar() {
        assert_eq!(
            EcdsaEngine::parse_private_key(&[0u8; 32]).unwrap_err(),
            CoreError::OutOfRange
        );
    }

    #[test]
    fn check_match_rejects_unrelated_keypair() {
        let private_key_a = EcdsaEngine::generate_private_key().unwrap();
        let private_key_b = EcdsaEngine::generate_private_key().unwrap();
        let public_key_b = EcdsaEngine::compute_public_key(&private_key_b).unwrap();
        assert!(!EcdsaEngine::check_match(&private_key_a, &public_key_b));
    }
}
