//! Cryptographic primitives: digests, RSA and ECDSA signature verification,
//! the elliptic-curve and modular-ring arithmetic they're built on, and CMS/
//! X.509 structure handling.
//!
//! This layer is verification-only. Key agreement, PACE, and Chip
//! Authentication (which require generating keys and performing
//! Diffie-Hellman) are chip-side concerns out of scope for a trust-material
//! mirror and are not implemented here.

pub mod cms;
pub mod digest;
pub mod ecdsa;
pub mod error;
pub mod groups;
pub mod mod_ring;
pub mod named_fields;
pub mod rsa;
pub mod x509;

use rand::{CryptoRng, RngCore};

pub trait CryptoCoreRng: CryptoRng + RngCore {}

impl<T> CryptoCoreRng for T where T: CryptoRng + RngCore {}
