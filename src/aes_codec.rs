//! AES in CFB (cipher feedback) mode: a stream cipher, so ciphertext is
//! exactly as long as plaintext and there is no padding to get wrong.
//!
//! Key length selects the AES variant (128/192/256-bit); the IV is always
//! 16 bytes, one AES block. Neither key nor IV material is ever logged.

use aes::{Aes128, Aes192, Aes256};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};

use crate::error::{CoreError, CoreResult};

/// Stateless AES-CFB encrypt/decrypt operations.
pub struct AesCodec;

impl AesCodec {
    pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> CoreResult<Vec<u8>> {
        Self::apply(plaintext, key, iv, true)
    }

    pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> CoreResult<Vec<u8>> {
        Self::apply(ciphertext, key, iv, false)
    }

    fn apply(input: &[u8], key: &[u8], iv: &[u8], encrypting: bool) -> CoreResult<Vec<u8>> {
        if iv.len() != 16 {
            return Err(CoreError::BadIvLength);
        }
        let mut buffer = input.to_vec();
        match key.len() {
            16 => Self::run_128(&mut buffer, key, iv, encrypting)?,
            24 => Self::run_192(&mut buffer, key, iv, encrypting)?,
            32 => Self::run_256(&mut buffer, key, iv, encrypting)?,
            _ => return Err(CoreError::BadKeyLength),
        }
        Ok(buffer)
    }

    fn run_128(buffer: &mut [u8], key: &[u8], iv: &[u8], encrypting: bool) -> CoreResult<()> {
        if encrypting {
            let cipher =
                Encryptor::<Aes128>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.encrypt(buffer);
        } else {
            let cipher =
                Decryptor::<Aes128>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.decrypt(buffer);
        }
        Ok(())
    }

    fn run_192(buffer: &mut [u8], key: &[u8], iv: &[u8], encrypting: bool) -> CoreResult<()> {
        if encrypting {
            let cipher =
                Encryptor::<Aes192>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.encrypt(buffer);
        } else {
            let cipher =
                Decryptor::<Aes192>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.decrypt(buffer);
        }
        Ok(())
    }

    fn run_256(buffer: &mut [u8], key: &[u8], iv: &[u8], encrypting: bool) -> CoreResult<()> {
        if encrypting {
            let cipher =
                Encryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.encrypt(buffer);
        } else {
            let cipher =
                Decryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| CoreError::BadKeyLength)?;
            cipher.decrypt(buffer);
        }
        Ok(())
    }
}
