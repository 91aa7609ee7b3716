//! secp256k1 in affine coordinates
//!
//! y² = x³ + 7 over the prime field P, group order N, generator G.
//! Scalar multiplication is plain double-and-add; it is not constant time.

use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::OnceLock;
use thiserror::Error;

use super::bigint::{mod_add, mod_inverse, mod_mul, mod_sub, to_bytes_32};
use crate::error::LanaError;

const P_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];
const N_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b,
    0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];
const GX_BYTES: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac,
    0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9,
    0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];
const GY_BYTES: [u8; 32] = [
    0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65,
    0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08, 0xa8,
    0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19,
    0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10, 0xd4, 0xb8,
];

/// Uncompressed SEC1 encoding length
pub const UNCOMPRESSED_LEN: usize = 65;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("Public key must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Public key must start with 0x04, got 0x{0:02x}")]
    InvalidPrefix(u8),

    #[error("Point is not on the curve")]
    NotOnCurve,

    #[error("Point at infinity has no encoding")]
    PointAtInfinity,
}

impl From<CurveError> for LanaError {
    fn from(e: CurveError) -> Self {
        LanaError::invalid_input(e.to_string())
    }
}

/// Domain parameters
#[derive(Debug)]
pub struct CurveParams {
    pub p: BigUint,
    pub n: BigUint,
    pub g: Point,
}

pub fn params() -> &'static CurveParams {
    static PARAMS: OnceLock<CurveParams> = OnceLock::new();
    PARAMS.get_or_init(|| CurveParams {
        p: BigUint::from_bytes_be(&P_BYTES),
        n: BigUint::from_bytes_be(&N_BYTES),
        g: Point::Affine {
            x: BigUint::from_bytes_be(&GX_BYTES),
            y: BigUint::from_bytes_be(&GY_BYTES),
        },
    })
}

/// Group order
pub fn order() -> &'static BigUint {
    &params().n
}

pub fn generator() -> &'static Point {
    &params().g
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: BigUint, y: BigUint },
}

impl Point {
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    pub fn x(&self) -> Option<&BigUint> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }

    pub fn is_on_curve(&self) -> bool {
        match self {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let p = &params().p;
                if x >= p || y >= p {
                    return false;
                }
                let lhs = mod_mul(y, y, p);
                let rhs = mod_add(&mod_mul(&mod_mul(x, x, p), x, p), &BigUint::from(7u8), p);
                lhs == rhs
            }
        }
    }

    pub fn negate(&self) -> Point {
        match self {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: mod_sub(&BigUint::zero(), y, &params().p),
            },
        }
    }

    pub fn add(&self, other: &Point) -> Point {
        let (x1, y1, x2, y2) = match (self, other) {
            (Point::Infinity, _) => return other.clone(),
            (_, Point::Infinity) => return self.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };
        let p = &params().p;

        if x1 == x2 {
            if mod_add(y1, y2, p).is_zero() {
                return Point::Infinity;
            }
            return self.double();
        }

        let denominator = match mod_inverse(&mod_sub(x2, x1, p), p) {
            Some(inv) => inv,
            None => return Point::Infinity,
        };
        let lambda = mod_mul(&mod_sub(y2, y1, p), &denominator, p);
        let x3 = mod_sub(&mod_sub(&mod_mul(&lambda, &lambda, p), x1, p), x2, p);
        let y3 = mod_sub(&mod_mul(&lambda, &mod_sub(x1, &x3, p), p), y1, p);
        Point::Affine { x: x3, y: y3 }
    }

    pub fn double(&self) -> Point {
        let (x, y) = match self {
            Point::Infinity => return Point::Infinity,
            Point::Affine { x, y } => (x, y),
        };
        if y.is_zero() {
            return Point::Infinity;
        }
        let p = &params().p;

        // a = 0, so λ = 3x² / 2y
        let numerator = mod_mul(&BigUint::from(3u8), &mod_mul(x, x, p), p);
        let denominator = match mod_inverse(&mod_add(y, y, p), p) {
            Some(inv) => inv,
            None => return Point::Infinity,
        };
        let lambda = mod_mul(&numerator, &denominator, p);
        let x3 = mod_sub(&mod_mul(&lambda, &lambda, p), &mod_add(x, x, p), p);
        let y3 = mod_sub(&mod_mul(&lambda, &mod_sub(x, &x3, p), p), y, p);
        Point::Affine { x: x3, y: y3 }
    }

    /// k·P, scanning the scalar from its most significant bit
    pub fn multiply(&self, k: &BigUint) -> Point {
        let mut result = Point::Infinity;
        if k.is_zero() || self.is_infinity() {
            return result;
        }
        for byte in k.to_bytes_be() {
            for bit in (0..8).rev() {
                result = result.double();
                if (byte >> bit) & 1 == 1 {
                    result = result.add(self);
                }
            }
        }
        result
    }

    /// `0x04 ‖ X ‖ Y`
    pub fn to_uncompressed(&self) -> Result<[u8; UNCOMPRESSED_LEN], CurveError> {
        match self {
            Point::Infinity => Err(CurveError::PointAtInfinity),
            Point::Affine { x, y } => {
                let mut out = [0u8; UNCOMPRESSED_LEN];
                out[0] = 0x04;
                out[1..33].copy_from_slice(&to_bytes_32(x));
                out[33..].copy_from_slice(&to_bytes_32(y));
                Ok(out)
            }
        }
    }

    pub fn from_uncompressed(bytes: &[u8]) -> Result<Point, CurveError> {
        if bytes.len() != UNCOMPRESSED_LEN {
            return Err(CurveError::InvalidLength {
                expected: UNCOMPRESSED_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != 0x04 {
            return Err(CurveError::InvalidPrefix(bytes[0]));
        }
        let point = Point::Affine {
            x: BigUint::from_bytes_be(&bytes[1..33]),
            y: BigUint::from_bytes_be(&bytes[33..]),
        };
        if !point.is_on_curve() {
            return Err(CurveError::NotOnCurve);
        }
        Ok(point)
    }
}

/// Public point for a private scalar
pub fn public_point(scalar: &BigUint) -> Point {
    generator().multiply(scalar)
}
