//! Deterministic ECDSA nonces (RFC 6979, HMAC-SHA256)
//!
//! The nonce depends only on the private scalar and the digest, so the same
//! key never reuses a nonce across different messages and no RNG is needed
//! at signing time.

use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::bigint::to_bytes_32;
use super::curve::order;
use crate::error::{LanaError, LanaResult};

type HmacSha256 = Hmac<Sha256>;

/// Candidate stream for one (key, digest) pair
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct NonceGenerator {
    k: [u8; 32],
    v: [u8; 32],
    #[zeroize(skip)]
    started: bool,
}

impl NonceGenerator {
    /// `secret` is the 32-byte big-endian private scalar, `digest` the
    /// message hash being signed.
    pub fn new(secret: &[u8; 32], digest: &[u8; 32]) -> LanaResult<Self> {
        let n = order();
        // bits2octets: the digest reduced mod N
        let h = to_bytes_32(&(BigUint::from_bytes_be(digest) % n));

        let mut gen = Self {
            k: [0u8; 32],
            v: [1u8; 32],
            started: false,
        };
        gen.k = gen.hmac(&[&gen.v, &[0x00], secret, &h])?;
        gen.v = gen.hmac(&[&gen.v])?;
        gen.k = gen.hmac(&[&gen.v, &[0x01], secret, &h])?;
        gen.v = gen.hmac(&[&gen.v])?;
        Ok(gen)
    }

    /// Next k in `[1, N-1]`
    pub fn next_candidate(&mut self) -> LanaResult<BigUint> {
        let n = order();
        loop {
            if self.started {
                self.k = self.hmac(&[&self.v, &[0x00]])?;
                self.v = self.hmac(&[&self.v])?;
            }
            self.started = true;

            self.v = self.hmac(&[&self.v])?;
            let candidate = BigUint::from_bytes_be(&self.v);
            if !candidate.is_zero() && &candidate < n {
                return Ok(candidate);
            }
        }
    }

    fn hmac(&self, parts: &[&[u8]]) -> LanaResult<[u8; 32]> {
        let mut mac = HmacSha256::new_from_slice(&self.k)
            .map_err(|e| LanaError::internal(format!("HMAC init failed: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        Ok(mac.finalize().into_bytes().into())
    }
}
