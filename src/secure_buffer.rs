//! Page-locked, zero-on-drop storage for secret byte material.
//!
//! Every private key, password, and derived key in this crate lives in a
//! `SecureBuffer` rather than a plain `Vec<u8>`. Locking is advisory: when
//! the platform refuses `mlock` (containers without `CAP_IPC_LOCK`, memory
//! limits, unsupported OSes) we log once and keep running without it, since
//! a wallet library that refuses to operate on an unlockable host is worse
//! than one that degrades.

use std::fmt;
use std::sync::Once;

use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{CoreError, CoreResult};

static LOCK_WARNING: Once = Once::new();

/// A growable byte buffer that zeroizes its contents on drop and makes a
/// best-effort attempt to keep its backing storage out of swap.
pub struct SecureBuffer {
    data: Vec<u8>,
    lock: Option<region::LockGuard>,
}

impl SecureBuffer {
    /// Allocates `size` zeroed bytes and attempts to page-lock them.
    pub fn new(size: usize) -> Self {
        let data = vec![0u8; size];
        let lock = Self::try_lock(&data);
        Self { data, lock }
    }

    /// Copies `src` into a fresh, independently locked buffer.
    pub fn from_bytes(src: &[u8]) -> Self {
        let data = src.to_vec();
        let lock = Self::try_lock(&data);
        Self { data, lock }
    }

    /// Decodes a hex string into a fresh buffer.
    ///
    /// Odd-length input or non-hex bytes both map to `BadEncoding`.
    pub fn from_hex(text: &str) -> CoreResult<Self> {
        let bytes = hex::decode(text).map_err(|_| CoreError::BadEncoding)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Fills a fresh `n`-byte buffer from the platform entropy source.
    pub fn generate_random(n: usize) -> CoreResult<Self> {
        let mut buf = Self::new(n);
        OsRng
            .try_fill_bytes(&mut buf.data)
            .map_err(|_| CoreError::EntropyUnavailable)?;
        Ok(buf)
    }

    /// Locks the full backing allocation, including spare capacity, so that
    /// bytes written in-place by `append`/`reserve` without a reallocation
    /// never land on an unlocked page.
    fn try_lock(data: &Vec<u8>) -> Option<region::LockGuard> {
        if data.capacity() == 0 {
            return None;
        }
        match region::lock(data.as_ptr(), data.capacity()) {
            Ok(guard) => Some(guard),
            Err(err) => {
                LOCK_WARNING.call_once(|| {
                    log::warn!(
                        "secure buffer could not be page-locked ({err}); \
                         continuing without memory locking"
                    );
                });
                None
            }
        }
    }

    /// Replaces the backing allocation, zeroizing whatever it held before
    /// and re-establishing the page lock on the new storage.
    fn replace_storage(&mut self, new_data: Vec<u8>) {
        self.data.zeroize();
        self.lock = None;
        self.lock = Self::try_lock(&new_data);
        self.data = new_data;
    }

    /// Grows or shrinks the buffer to exactly `n` bytes, preserving the
    /// leading `min(len, n)` bytes and zero-filling any new tail.
    pub fn resize(&mut self, n: usize) {
        let mut new_data = vec![0u8; n];
        let copy_len = self.data.len().min(n);
        new_data[..copy_len].copy_from_slice(&self.data[..copy_len]);
        self.replace_storage(new_data);
    }

    /// Ensures at least `additional` more bytes can be appended without a
    /// further reallocation.
    pub fn reserve(&mut self, additional: usize) {
        if self.data.capacity() >= self.data.len() + additional {
            return;
        }
        let mut new_data = Vec::with_capacity(self.data.len() + additional);
        new_data.extend_from_slice(&self.data);
        self.replace_storage(new_data);
    }

    /// Overwrites every byte currently in the buffer with `byte`.
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }

    /// Zeroizes the entire backing allocation, including any spare
    /// capacity left over from a previous shrink, and sets the length to 0.
    pub fn clear(&mut self) {
        let cap = self.data.capacity();
        self.data.resize(cap, 0);
        self.data.zeroize();
        self.data.truncate(0);
    }

    /// Appends `other`'s bytes, reallocating (and re-locking) if needed.
    pub fn append(&mut self, other: &SecureBuffer) {
        let new_len = self.data.len() + other.data.len();
        if new_len > self.data.capacity() {
            let mut new_data = Vec::with_capacity(new_len);
            new_data.extend_from_slice(&self.data);
            new_data.extend_from_slice(&other.data);
            self.replace_storage(new_data);
        } else {
            self.data.extend_from_slice(&other.data);
        }
    }

    /// Returns a new buffer holding `self`'s bytes followed by `other`'s.
    pub fn concat(&self, other: &SecureBuffer) -> SecureBuffer {
        let mut result = SecureBuffer::from_bytes(&self.data);
        result.append(other);
        result
    }

    /// Constant-time, length-then-byte equality check.
    pub fn equals(&self, other: &SecureBuffer) -> bool {
        if self.data.len() != other.data.len() {
            return false;
        }
        self.data.ct_eq(&other.data).into()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

impl Clone for SecureBuffer {
    fn clone(&self) -> Self {
        Self::from_bytes(&self.data)
    }
}

impl PartialEq for SecureBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for SecureBuffer {}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.data.len())
            .field("locked", &self.lock.is_some())
            .finish()
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hex_round_trips() {
        let buf = SecureBuffer::from_hex("deadbeef").unwrap();
        assert_eq!(buf.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(buf.to_hex(), "deadbeef");
    }

    #[test]
    fn from_hex_rejects_odd_length() {
        assert_eq!(SecureBuffer::from_hex("abc").unwrap_err(), CoreError::BadEncoding);
    }

    #[test]
    fn from_hex_rejects_non_hex_bytes() {
        assert_eq!(SecureBuffer::from_hex("zz").unwrap_err(), CoreError::BadEncoding);
    }

    #[test]
    fn clone_is_independent() {
        let original = SecureBuffer::from_bytes(b"secret");
        let mut copy = original.clone();
        copy.fill(0);
        assert_eq!(original.as_slice(), b"secret");
        assert!(copy.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn equals_is_length_sensitive() {
        let a = SecureBuffer::from_bytes(b"abc");
        let b = SecureBuffer::from_bytes(b"abcd");
        assert!(!a.equals(&b));
        assert_eq!(a, SecureBuffer::from_bytes(b"abc"));
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buf = SecureBuffer::from_bytes(b"super secret");
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn resize_preserves_prefix_and_zero_fills_tail() {
        let mut buf = SecureBuffer::from_bytes(&[1, 2, 3]);
        buf.resize(5);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 0, 0]);
        buf.resize(2);
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn append_and_concat() {
        let a = SecureBuffer::from_bytes(b"foo");
        let b = SecureBuffer::from_bytes(b"bar");
        let combined = a.concat(&b);
        assert_eq!(combined.as_slice(), b"foobar");

        let mut mutable = a.clone();
        mutable.append(&b);
        assert_eq!(mutable.as_slice(), b"foobar");
    }

    #[test]
    fn generate_random_produces_requested_length() {
        let buf = SecureBuffer::generate_random(32).unwrap();
        assert_eq!(buf.len(), 32);
    }
}
