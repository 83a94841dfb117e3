//! Cryptographic core for wallet-security software: a page-locked,
//! zeroizing secret buffer; a memory-hard ROMix key derivation function; an
//! AES-CFB stream cipher; and a secp256k1/SHA-256 ECDSA engine.
//!
//! This crate deliberately stops at the cryptographic primitives. Wallet
//! file formats, address encoding, transaction construction, network I/O,
//! and key-derivation hierarchies (BIP32 and friends) are the surrounding
//! host's responsibility, not this crate's.

pub mod aes_codec;
pub mod ecdsa;
pub mod error;
pub mod kdf;
pub mod secure_buffer;

pub use aes_codec::AesCodec;
pub use ecdsa::{EcdsaEngine, PublicKey};
pub use error::{CoreError, CoreResult};
pub use kdf::{KdfParams, KdfRomix, HASH_NAME, HASH_OUTPUT_BYTES, OUTPUT_BYTES};
pub use secure_buffer::SecureBuffer;
