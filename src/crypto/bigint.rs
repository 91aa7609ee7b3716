//! Modular arithmetic over arbitrary-precision unsigned integers
//!
//! Operands are reduced before use, so callers may pass values that are
//! larger than the modulus.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

pub fn mod_add(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a + b) % m
}

pub fn mod_sub(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    let a = a % m;
    let b = b % m;
    if a >= b {
        a - b
    } else {
        m - (b - a)
    }
}

pub fn mod_mul(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a * b) % m
}

/// Multiplicative inverse by the extended Euclidean algorithm.
///
/// `None` when `a ≡ 0` or `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let a = a % m;
    if a.is_zero() {
        return None;
    }

    let modulus = BigInt::from_biguint(Sign::Plus, m.clone());
    let (mut old_r, mut r) = (BigInt::from_biguint(Sign::Plus, a), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return None;
    }

    let inverse = ((old_s % &modulus) + &modulus) % &modulus;
    inverse.to_biguint()
}

pub fn from_bytes_be(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Big-endian, left-padded to 32 bytes. Values wider than 256 bits keep
/// their low 32 bytes.
pub fn to_bytes_32(n: &BigUint) -> [u8; 32] {
    let bytes = n.to_bytes_be();
    let mut out = [0u8; 32];
    if bytes.len() >= 32 {
        out.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        out[32 - bytes.len()..].copy_from_slice(&bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_mod_basic() {
        assert_eq!(mod_add(&n(5), &n(9), &n(11)), n(3));
        assert_eq!(mod_sub(&n(3), &n(9), &n(11)), n(5));
        assert_eq!(mod_sub(&n(30), &n(9), &n(11)), n(10));
        assert_eq!(mod_mul(&n(7), &n(8), &n(11)), n(1));
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(mod_inverse(&n(3), &n(11)), Some(n(4)));
        assert_eq!(mod_inverse(&n(10), &n(17)), Some(n(12)));
        assert_eq!(mod_inverse(&n(0), &n(11)), None);
        assert_eq!(mod_inverse(&n(22), &n(11)), None);
        assert_eq!(mod_inverse(&n(6), &n(9)), None);
    }

    #[test]
    fn test_inverse_times_value_is_one() {
        let m = n(1_000_000_007);
        for v in [2u64, 12345, 999_999_999] {
            let inv = mod_inverse(&n(v), &m).unwrap();
            assert_eq!(mod_mul(&n(v), &inv, &m), n(1));
        }
    }

    #[test]
    fn test_to_bytes_32_pads() {
        let bytes = to_bytes_32(&n(0x0102));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
        assert_eq!(from_bytes_be(&bytes), n(0x0102));
    }
}
