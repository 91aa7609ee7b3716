//! ECDSA over secp256k1
//!
//! Signatures are low-S normalized and DER encoded the strict way Bitcoin
//! derived nodes require.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::bigint::{mod_add, mod_inverse, mod_mul, to_bytes_32};
use super::curve::{generator, order, Point};
use super::nonce::NonceGenerator;
use crate::error::{LanaError, LanaResult};
use crate::log_debug;

/// Nonce candidates tried before giving up on a digest
const MAX_NONCE_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
}

impl Signature {
    pub fn is_low_s(&self) -> bool {
        self.s <= half_order()
    }

    pub fn to_der(&self) -> Vec<u8> {
        encode_der(self)
    }
}

fn half_order() -> BigUint {
    order() >> 1
}

/// Sign a 32-byte digest with private scalar `d`.
///
/// Nonces come from RFC 6979; a candidate yielding `r == 0` or `s == 0` is
/// discarded and the next one tried.
pub fn sign_digest(digest: &[u8; 32], d: &BigUint) -> LanaResult<Signature> {
    let n = order();
    if d.is_zero() || d >= n {
        return Err(LanaError::invalid_private_key("Private scalar out of range"));
    }

    let z = BigUint::from_bytes_be(digest) % n;
    let mut nonces = NonceGenerator::new(&to_bytes_32(d), digest)?;

    let mut last_error = LanaError::invalid_nonce("No nonce candidate produced");
    for attempt in 0..MAX_NONCE_ATTEMPTS {
        let k = nonces.next_candidate()?;
        match sign_with_nonce(&z, d, &k) {
            Ok(signature) => return Ok(signature),
            Err(e) => {
                log_debug!(
                    "ecdsa",
                    "Nonce candidate rejected",
                    attempt = attempt,
                    code = e.code.as_str(),
                );
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// One signing attempt with a fixed nonce
pub(crate) fn sign_with_nonce(z: &BigUint, d: &BigUint, k: &BigUint) -> LanaResult<Signature> {
    let n = order();

    let r = match generator().multiply(k).x() {
        Some(x) => x % n,
        None => return Err(LanaError::invalid_nonce("Nonce produced the point at infinity")),
    };
    if r.is_zero() {
        return Err(LanaError::invalid_nonce("Nonce produced r = 0"));
    }

    let k_inv = mod_inverse(k, n).ok_or_else(|| LanaError::invalid_nonce("Nonce has no inverse"))?;
    let mut s = mod_mul(&k_inv, &mod_add(z, &mod_mul(&r, d, n), n), n);
    if s.is_zero() {
        return Err(LanaError::invalid_signature("Signature produced s = 0"));
    }

    if s > half_order() {
        s = n - &s;
    }
    Ok(Signature { r, s })
}

/// Check `signature` over `digest` against an uncompressed public point
pub fn verify(digest: &[u8; 32], signature: &Signature, public_key: &Point) -> bool {
    let n = order();
    let one = BigUint::one();
    if signature.r < one || &signature.r >= n || signature.s < one || &signature.s >= n {
        return false;
    }
    if public_key.is_infinity() || !public_key.is_on_curve() {
        return false;
    }

    let z = BigUint::from_bytes_be(digest) % n;
    let w = match mod_inverse(&signature.s, n) {
        Some(w) => w,
        None => return false,
    };
    let u1 = mod_mul(&z, &w, n);
    let u2 = mod_mul(&signature.r, &w, n);
    let point = generator().multiply(&u1).add(&public_key.multiply(&u2));

    match point.x() {
        Some(x) => (x % n) == signature.r,
        None => false,
    }
}

/// `0x30 len 0x02 rlen r 0x02 slen s`, integers minimal and non-negative
pub fn encode_der(signature: &Signature) -> Vec<u8> {
    let r = der_integer(&signature.r);
    let s = der_integer(&signature.s);

    let mut out = Vec::with_capacity(6 + r.len() + s.len());
    out.push(0x30);
    out.push((4 + r.len() + s.len()) as u8);
    out.push(0x02);
    out.push(r.len() as u8);
    out.extend_from_slice(&r);
    out.push(0x02);
    out.push(s.len() as u8);
    out.extend_from_slice(&s);
    out
}

fn der_integer(value: &BigUint) -> Vec<u8> {
    let mut bytes = value.to_bytes_be();
    if bytes.first().map_or(false, |b| b & 0x80 != 0) {
        bytes.insert(0, 0x00);
    }
    bytes
}

/// Strict DER parse; rejects long-form lengths, padding and trailing bytes
pub fn decode_der(bytes: &[u8]) -> LanaResult<Signature> {
    let invalid =
        |msg: &str| LanaError::invalid_signature(format!("Malformed DER signature: {}", msg));

    if bytes.len() < 8 || bytes.len() > 72 {
        return Err(invalid("bad total length"));
    }
    if bytes[0] != 0x30 {
        return Err(invalid("missing sequence tag"));
    }
    if bytes[1] as usize != bytes.len() - 2 {
        return Err(invalid("sequence length mismatch"));
    }

    let (r, rest) = read_der_integer(&bytes[2..]).map_err(|m| invalid(m))?;
    let (s, rest) = read_der_integer(rest).map_err(|m| invalid(m))?;
    if !rest.is_empty() {
        return Err(invalid("trailing bytes"));
    }
    if r.is_zero() || s.is_zero() {
        return Err(invalid("zero component"));
    }
    Ok(Signature { r, s })
}

fn read_der_integer(bytes: &[u8]) -> Result<(BigUint, &[u8]), &'static str> {
    if bytes.len() < 2 || bytes[0] != 0x02 {
        return Err("missing integer tag");
    }
    let len = bytes[1] as usize;
    if len == 0 || len > 33 {
        return Err("bad integer length");
    }
    let body = bytes.get(2..2 + len).ok_or("integer overruns buffer")?;
    if body[0] & 0x80 != 0 {
        return Err("negative integer");
    }
    if len > 1 && body[0] == 0x00 && body[1] & 0x80 == 0 {
        return Err("non-minimal integer");
    }
    Ok((BigUint::from_bytes_be(body), &bytes[2 + len..]))
}
