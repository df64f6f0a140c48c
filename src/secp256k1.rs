//! secp256k1 parameters and the points of that curve: SEC encoding,
//! HASH160 fingerprints and Base58Check addresses.

use std::fmt;
use std::ops::{Add, Mul};
use std::sync::LazyLock;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;

use crate::curves::{Point, scalar_mul};
use crate::ecdsa::{Signature, verify};
use crate::encoding::encode_base58check;
use crate::error::{BitcoinError, Result};
use crate::field::FieldElement;
use crate::hash::hash160;
use crate::keys::Network;

/// The secp256k1 domain parameters
#[derive(Debug, Clone)]
pub struct Secp256k1 {
    /// Field prime, 2^256 - 2^32 - 977
    pub p: BigInt,
    /// Order of the generator
    pub n: BigInt,
    pub a: FieldElement,
    pub b: FieldElement,
    pub g: S256Point,
}

fn hex_constant(digits: &[u8]) -> BigInt {
    BigInt::parse_bytes(digits, 16).expect("valid hex constant")
}

fn secp256k1() -> Secp256k1 {
    // http://www.oid-info.com/get/1.3.132.0.10
    let p = hex_constant(b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F");
    let n = hex_constant(b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
    let gx = hex_constant(b"79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798");
    let gy = hex_constant(b"483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8");

    let field = |v: BigInt| FieldElement::new(v, p.clone()).expect("constant below p");
    let a = field(BigInt::from(0));
    let b = field(BigInt::from(7));
    let g = Point::new(field(gx), field(gy), a.clone(), b.clone())
        .expect("generator lies on secp256k1");

    Secp256k1 {
        p: p.clone(),
        n,
        a,
        b,
        g: S256Point(g),
    }
}

/// Global secp256k1 parameters
pub static SECP256K1: LazyLock<Secp256k1> = LazyLock::new(secp256k1);

/// Big-endian, left-padded 32-byte form of a 256-bit integer
pub fn to_bytes32(n: &BigInt) -> [u8; 32] {
    let (_, bytes) = n.to_bytes_be();
    let mut result = [0u8; 32];
    let len = bytes.len().min(32);
    result[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    result
}

/// A point on secp256k1 (or its point at infinity)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S256Point(Point);

impl S256Point {
    /// Create a point from affine coordinates, checking curve membership
    pub fn new(x: BigInt, y: BigInt) -> Result<Self> {
        let p = &SECP256K1.p;
        let x = FieldElement::new(x, p.clone())?;
        let y = FieldElement::new(y, p.clone())?;
        let point = Point::new(x, y, SECP256K1.a.clone(), SECP256K1.b.clone())?;
        Ok(S256Point(point))
    }

    /// The generator G
    pub fn generator() -> Self {
        SECP256K1.g.clone()
    }

    pub fn infinity() -> Self {
        S256Point(Point::infinity(SECP256K1.a.clone(), SECP256K1.b.clone()))
    }

    #[inline]
    pub fn is_infinity(&self) -> bool {
        self.0.is_infinity()
    }

    #[inline]
    pub fn x(&self) -> Option<&FieldElement> {
        self.0.x.as_ref()
    }

    #[inline]
    pub fn y(&self) -> Option<&FieldElement> {
        self.0.y.as_ref()
    }

    /// The underlying generic curve point
    pub fn point(&self) -> &Point {
        &self.0
    }

    /// SEC encoding: `02|03 || x` compressed, `04 || x || y` uncompressed
    pub fn sec(&self, compressed: bool) -> Result<Vec<u8>> {
        let (x, y) = self.0.coords().ok_or_else(|| {
            BitcoinError::InvalidPublicKey("point at infinity has no SEC encoding".into())
        })?;

        let mut out = Vec::with_capacity(if compressed { 33 } else { 65 });
        if compressed {
            out.push(if y.is_even() { 0x02 } else { 0x03 });
            out.extend_from_slice(&to_bytes32(x.value()));
        } else {
            out.push(0x04);
            out.extend_from_slice(&to_bytes32(x.value()));
            out.extend_from_slice(&to_bytes32(y.value()));
        }
        Ok(out)
    }

    /// Decode a SEC public key, recovering `y` for the compressed forms
    pub fn parse(sec: &[u8]) -> Result<Self> {
        let invalid = |e: BitcoinError| BitcoinError::InvalidPublicKey(e.to_string());

        match sec.first().copied() {
            Some(0x04) => {
                if sec.len() != 65 {
                    return Err(BitcoinError::InvalidPublicKey(format!(
                        "uncompressed key must be 65 bytes, got {}",
                        sec.len()
                    )));
                }
                let x = BigInt::from_bytes_be(Sign::Plus, &sec[1..33]);
                let y = BigInt::from_bytes_be(Sign::Plus, &sec[33..65]);
                S256Point::new(x, y).map_err(invalid)
            }
            Some(prefix @ (0x02 | 0x03)) => {
                if sec.len() != 33 {
                    return Err(BitcoinError::InvalidPublicKey(format!(
                        "compressed key must be 33 bytes, got {}",
                        sec.len()
                    )));
                }
                let p = &SECP256K1.p;
                let x = FieldElement::new(BigInt::from_bytes_be(Sign::Plus, &sec[1..]), p.clone())
                    .map_err(invalid)?;

                // y^2 = x^3 + 7
                let alpha = (&x.pow(3) + &SECP256K1.b)?;
                let beta = alpha.sqrt();
                if beta.pow(2) != alpha {
                    return Err(BitcoinError::InvalidPublicKey(
                        "x coordinate is not on secp256k1".into(),
                    ));
                }

                let y = if beta.is_even() == (prefix == 0x02) {
                    beta.value().clone()
                } else {
                    p - beta.value()
                };
                S256Point::new(x.value().clone(), y).map_err(invalid)
            }
            Some(prefix) => Err(BitcoinError::InvalidPublicKey(format!(
                "unknown SEC prefix 0x{prefix:02x}"
            ))),
            None => Err(BitcoinError::InvalidPublicKey("empty SEC encoding".into())),
        }
    }

    /// HASH160 of the SEC encoding
    pub fn hash160(&self, compressed: bool) -> Result<[u8; 20]> {
        Ok(hash160(&self.sec(compressed)?))
    }

    /// Base58Check P2PKH address
    pub fn address(&self, compressed: bool, network: Network) -> Result<String> {
        let mut payload = vec![network.version_byte()];
        payload.extend_from_slice(&self.hash160(compressed)?);
        Ok(encode_base58check(&payload))
    }

    /// Check an ECDSA signature of `z` against this public key
    pub fn verify(&self, z: &BigInt, sig: &Signature) -> bool {
        verify(self, z, sig)
    }
}

impl fmt::Display for S256Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.coords() {
            Some((x, y)) => write!(f, "S256Point({:064x}, {:064x})", x.value(), y.value()),
            None => write!(f, "S256Point(infinity)"),
        }
    }
}

impl Add<&S256Point> for &S256Point {
    type Output = Result<S256Point>;

    fn add(self, other: &S256Point) -> Result<S256Point> {
        Ok(S256Point((&self.0 + &other.0)?))
    }
}

/// Scalar multiplication; the scalar is reduced mod N first
impl Mul<&S256Point> for &BigInt {
    type Output = Result<S256Point>;

    fn mul(self, point: &S256Point) -> Result<S256Point> {
        let coef = self.mod_floor(&SECP256K1.n);
        Ok(S256Point(scalar_mul(&coef, &point.0)?))
    }
}

impl Mul<&S256Point> for BigInt {
    type Output = Result<S256Point>;

    fn mul(self, point: &S256Point) -> Result<S256Point> {
        &self * point
    }
}
