//! Error taxonomy shared by every component.
//!
//! Parsing and parameter errors are always surfaced to the caller; there are
//! no retries anywhere in this crate. `EcdsaEngine::verify` is the one
//! exception — a malformed signature or key is indistinguishable from an
//! invalid one at that API, so parse failures collapse to `false` there
//! instead of propagating an error.

use thiserror::Error;

/// Every failure mode this crate can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// `SecureBuffer::from_hex` saw an odd-length string or a non-hex byte.
    #[error("invalid hex encoding")]
    BadEncoding,

    /// AES key was not 16, 24, or 32 bytes.
    #[error("key length must be 16, 24, or 32 bytes")]
    BadKeyLength,

    /// IV was not exactly 16 bytes.
    #[error("iv length must be exactly 16 bytes")]
    BadIvLength,

    /// A key blob had the wrong structural shape (length, prefix byte, ...).
    #[error("key has the wrong structural shape")]
    BadKeyFormat,

    /// A public key's coordinates do not satisfy the curve equation.
    #[error("point does not satisfy the curve equation")]
    NotOnCurve,

    /// A public key encodes the identity element.
    #[error("point is the identity element")]
    IsIdentity,

    /// A scalar is not in `[1, n-1]`.
    #[error("scalar is outside the valid range [1, n-1]")]
    OutOfRange,

    /// KDF memory or iteration parameters are not acceptable.
    #[error("KDF memory or iteration parameters are invalid")]
    BadParams,

    /// The platform's cryptographic entropy source could not be read.
    #[error("platform entropy source is unavailable")]
    EntropyUnavailable,
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
