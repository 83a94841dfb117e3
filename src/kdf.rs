//! ROMix: a memory-hard, self-calibrating key derivation function built on
//! SHA-512, after Colin Percival's scrypt construction.
//!
//! A single round (`derive_one_iter`) hashes the password and salt into a
//! seed, walks the seed forward through a lookup table (the fill phase),
//! then walks it again through table entries chosen by the seed itself
//! (the mix phase). `derive` chains `iterations` rounds, feeding each
//! round's output back in as the next round's password.

use sha2::{Digest, Sha512};
use std::time::Instant;

use crate::error::{CoreError, CoreResult};
use crate::secure_buffer::SecureBuffer;

/// Digest size of the hash driving both phases.
pub const HASH_OUTPUT_BYTES: usize = 64;
/// Length of the key material `derive`/`derive_one_iter` hand back.
pub const OUTPUT_BYTES: usize = 32;
/// Name of the underlying hash, kept around for parameter round-tripping.
pub const HASH_NAME: &str = "SHA-512";

/// Validated memory/iteration/salt parameters for one `KdfRomix` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_bytes: u32,
    pub iterations: u32,
    pub salt: Vec<u8>,
}

impl KdfParams {
    /// Validates and builds a parameter set.
    ///
    /// `memory_bytes` must be a nonzero multiple of `HASH_OUTPUT_BYTES` and
    /// at least that large; `iterations` must be at least 1.
    pub fn new(memory_bytes: u32, iterations: u32, salt: Vec<u8>) -> CoreResult<Self> {
        if memory_bytes < HASH_OUTPUT_BYTES as u32
            || memory_bytes % HASH_OUTPUT_BYTES as u32 != 0
            || iterations == 0
        {
            return Err(CoreError::BadParams);
        }
        Ok(Self {
            memory_bytes,
            iterations,
            salt,
        })
    }

    /// Number of `HASH_OUTPUT_BYTES`-sized slots in the lookup table.
    pub fn sequence_count(&self) -> u32 {
        self.memory_bytes / HASH_OUTPUT_BYTES as u32
    }

    /// Serializes as `memory_bytes(LE u32) || iterations(LE u32) ||
    /// salt_len(u8) || salt`, the wire form a host persists alongside an
    /// encrypted wallet.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.salt.len());
        out.extend_from_slice(&self.memory_bytes.to_le_bytes());
        out.extend_from_slice(&self.iterations.to_le_bytes());
        out.push(self.salt.len() as u8);
        out.extend_from_slice(&self.salt);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < 9 {
            return Err(CoreError::BadParams);
        }
        let memory_bytes = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let iterations = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let salt_len = bytes[8] as usize;
        let salt = bytes
            .get(9..9 + salt_len)
            .ok_or(CoreError::BadParams)?
            .to_vec();
        Self::new(memory_bytes, iterations, salt)
    }
}

/// A ROMix instance: validated parameters plus the preallocated,
/// page-locked lookup table the fill/mix phases run over.
pub struct KdfRomix {
    params: KdfParams,
    lookup_table: SecureBuffer,
}

impl KdfRomix {
    /// Builds an instance from caller-supplied parameters, skipping
    /// calibration. Used when a host is re-deriving a key under parameters
    /// it already persisted.
    pub fn use_precomputed_params(
        memory_bytes: u32,
        iterations: u32,
        salt: Vec<u8>,
    ) -> CoreResult<Self> {
        let params = KdfParams::new(memory_bytes, iterations, salt)?;
        let lookup_table = SecureBuffer::new(params.memory_bytes as usize);
        Ok(Self {
            params,
            lookup_table,
        })
    }

    /// Self-calibrates memory and iteration count against the running
    /// host: doubles the lookup table while a single round stays under a
    /// quarter of `target_seconds` and memory stays within `max_memory`,
    /// then picks an iteration count that spends roughly `target_seconds`
    /// in total. Draws a fresh random salt.
    pub fn compute_params(target_seconds: f64, max_memory: u32) -> CoreResult<Self> {
        let max_memory = (max_memory / HASH_OUTPUT_BYTES as u32).max(1) * HASH_OUTPUT_BYTES as u32;
        let mut memory = (HASH_OUTPUT_BYTES as u32 * 16).min(max_memory);

        let probe_password = SecureBuffer::from_bytes(b"romix-calibration-probe");
        loop {
            let mut trial = Self::use_precomputed_params(memory, 1, vec![0u8; HASH_OUTPUT_BYTES])?;
            let start = Instant::now();
            let _ = trial.derive_one_iter(&probe_password);
            let elapsed = start.elapsed().as_secs_f64();

            let next_memory = memory.saturating_mul(2);
            if elapsed >= target_seconds / 4.0 || next_memory > max_memory {
                break;
            }
            memory = next_memory;
        }

        let salt = Self::random_salt()?;
        let mut instance = Self::use_precomputed_params(memory, 1, salt)?;
        let start = Instant::now();
        let _ = instance.derive_one_iter(&probe_password);
        let t1 = start.elapsed().as_secs_f64().max(f64::EPSILON);
        let iterations = ((target_seconds / t1).floor() as u32).max(1);
        instance.params.iterations = iterations;
        Ok(instance)
    }

    fn random_salt() -> CoreResult<Vec<u8>> {
        let buf = SecureBuffer::generate_random(HASH_OUTPUT_BYTES / 2)?;
        Ok(buf.as_slice().to_vec())
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Runs a single ROMix round: fill phase followed by mix phase,
    /// returning the first `OUTPUT_BYTES` of the final state as derived
    /// key material.
    pub fn derive_one_iter(&mut self, password: &SecureBuffer) -> SecureBuffer {
        let sequence_count = self.params.sequence_count() as usize;
        let mut x = [0u8; HASH_OUTPUT_BYTES];
        {
            let mut hasher = Sha512::new();
            hasher.update(password.as_slice());
            hasher.update(&self.params.salt);
            x.copy_from_slice(&hasher.finalize());
        }

        let table = self.lookup_table.as_mut_slice();
        for i in 0..sequence_count {
            table[i * HASH_OUTPUT_BYTES..(i + 1) * HASH_OUTPUT_BYTES].copy_from_slice(&x);
            let mut hasher = Sha512::new();
            hasher.update(&x);
            x.copy_from_slice(&hasher.finalize());
        }

        for _ in 0..sequence_count {
            let v = u64::from_le_bytes(x[0..8].try_into().unwrap());
            let j = (v as usize) % sequence_count;
            let mut mixed = [0u8; HASH_OUTPUT_BYTES];
            for (k, byte) in mixed.iter_mut().enumerate() {
                *byte = x[k] ^ table[j * HASH_OUTPUT_BYTES + k];
            }
            let mut hasher = Sha512::new();
            hasher.update(&mixed);
            x.copy_from_slice(&hasher.finalize());
        }

        SecureBuffer::from_bytes(&x[0..OUTPUT_BYTES])
    }

    /// Chains `params.iterations` rounds, feeding each round's output back
    /// in as the next round's password.
    pub fn derive(&mut self, password: &SecureBuffer) -> SecureBuffer {
        let mut current = password.clone();
        for _ in 0..self.params.iterations {
            current = self.derive_one_iter(&current);
        }
        current
    }
}
