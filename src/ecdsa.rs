//! Elliptic Curve Digital Signature Algorithm (ECDSA)
//! Functions that sign/verify digital signatures and the DER codec

use std::fmt;
use std::io::Cursor;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::One;

use crate::encoding::{read_bytes, read_u8};
use crate::error::{BitcoinError, Result};
use crate::hash::hash256;
use crate::keys::gen_secret_key;
use crate::secp256k1::{S256Point, SECP256K1};

/// ECDSA Signature (r, s)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: BigInt,
    pub s: BigInt,
}

impl Signature {
    pub fn new(r: BigInt, s: BigInt) -> Self {
        Signature { r, s }
    }

    /// Decode from DER format
    /// Format: 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S]
    pub fn parse(der: &[u8]) -> Result<Self> {
        let malformed = |_| BitcoinError::MalformedSignature("truncated DER");
        let mut cursor = Cursor::new(der);

        if read_u8(&mut cursor, "marker").map_err(malformed)? != 0x30 {
            return Err(BitcoinError::MalformedSignature("bad compound marker"));
        }
        let total_len = read_u8(&mut cursor, "length").map_err(malformed)? as usize;
        if total_len + 2 != der.len() {
            return Err(BitcoinError::MalformedSignature("bad total length"));
        }

        let r = parse_der_int(&mut cursor)?;
        let s = parse_der_int(&mut cursor)?;

        if der.len() != 6 + r.len() + s.len() {
            return Err(BitcoinError::MalformedSignature("length mismatch"));
        }

        Ok(Signature {
            r: BigInt::from_bytes_be(Sign::Plus, &r),
            s: BigInt::from_bytes_be(Sign::Plus, &s),
        })
    }

    /// Encode to DER format
    #[must_use]
    pub fn der(&self) -> Vec<u8> {
        let mut content = encode_der_int(&self.r);
        content.extend(encode_der_int(&self.s));
        debug_assert!(content.len() <= 0xff, "DER content too long for a short-form length");

        let mut result = vec![0x30, content.len() as u8];
        result.extend(content);
        result
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:x},{:x})", self.r, self.s)
    }
}

fn parse_der_int(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let malformed = |_| BitcoinError::MalformedSignature("truncated DER");
    if read_u8(cursor, "integer marker").map_err(malformed)? != 0x02 {
        return Err(BitcoinError::MalformedSignature("bad integer marker"));
    }
    let len = read_u8(cursor, "integer length").map_err(malformed)? as usize;
    let value = read_bytes(cursor, len, "integer").map_err(malformed)?;
    // 32 bytes plus a possible sign-padding zero
    if len > 33 || (len == 33 && value[0] != 0x00) {
        return Err(BitcoinError::MalformedSignature("integer wider than 256 bits"));
    }
    Ok(value)
}

/// `0x02 len value`, with leading zeros stripped and a single 0x00
/// restored when the high bit is set. Every bit of `n` is kept.
fn encode_der_int(n: &BigInt) -> Vec<u8> {
    let bytes = n.magnitude().to_bytes_be();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let mut value = bytes[start..].to_vec();
    if value[0] & 0x80 != 0 {
        value.insert(0, 0x00);
    }

    let mut out = vec![0x02, value.len() as u8];
    out.extend(value);
    out
}

/// Interpret HASH256 of a message as a big-endian integer
pub fn hash_message(message: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &hash256(message))
}

/// Inverse mod N through Fermat's little theorem
fn inv_mod_n(x: &BigInt) -> BigInt {
    let n = &SECP256K1.n;
    x.modpow(&(n - BigInt::from(2)), n)
}

/// Sign `z` with a random ephemeral nonce
pub fn sign(secret: &BigInt, z: &BigInt) -> Result<Signature> {
    let k = gen_secret_key(&SECP256K1.n);
    sign_with_nonce(secret, z, &k)
}

/// Sign `z` with an explicit nonce `k`.
/// Produces the low-s form of the signature.
pub fn sign_with_nonce(secret: &BigInt, z: &BigInt, k: &BigInt) -> Result<Signature> {
    let n = &SECP256K1.n;
    if k < &BigInt::one() || k >= n {
        return Err(BitcoinError::ValueOutOfRange {
            value: k.to_string(),
            modulus: n.to_string(),
        });
    }

    let point = (k * &S256Point::generator())?;
    let r = point
        .x()
        .map(|x| x.value().clone())
        .ok_or_else(|| BitcoinError::InvalidPublicKey("nonce point is infinity".into()))?;
    let mut s = ((z + &r * secret) * inv_mod_n(k)).mod_floor(n);

    // Low-s normalization
    let half_n = n / BigInt::from(2);
    if s > half_n {
        s = n - &s;
    }

    Ok(Signature::new(r, s))
}

/// Verify a signature
///
/// Returns `true` if the signature is valid for the given public key and
/// signature hash. Never fails: out-of-range values are simply invalid.
#[must_use]
pub fn verify(point: &S256Point, z: &BigInt, sig: &Signature) -> bool {
    let n = &SECP256K1.n;
    if sig.r < BigInt::one() || &sig.r >= n || sig.s < BigInt::one() || &sig.s >= n {
        return false;
    }

    let s_inv = inv_mod_n(&sig.s);
    let u = (z * &s_inv).mod_floor(n);
    let v = (&sig.r * &s_inv).mod_floor(n);

    match combine(&u, &v, point) {
        Ok(sum) => sum.x().is_some_and(|x| x.value().mod_floor(n) == sig.r),
        Err(_) => false,
    }
}

/// u*G + v*P
fn combine(u: &BigInt, v: &BigInt, point: &S256Point) -> Result<S256Point> {
    let ug = (u * &S256Point::generator())?;
    let vp = (v * point)?;
    &ug + &vp
}
