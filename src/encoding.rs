//! Byte-level codecs shared by the wire formats: little-endian integers,
//! variable-length integers and Base58(Check).

use std::io::{Cursor, Read};

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::error::{BitcoinError, Result};
use crate::hash::hash256;

/// Read exactly `n` bytes, reporting truncation as a format error.
/// `n` usually comes off the wire, so it is checked against the bytes
/// left before anything is allocated.
pub fn read_bytes(cursor: &mut Cursor<&[u8]>, n: usize, what: &str) -> Result<Vec<u8>> {
    let remaining = cursor
        .get_ref()
        .len()
        .saturating_sub(cursor.position() as usize);
    if n > remaining {
        return Err(BitcoinError::Format(format!(
            "Failed to read {what}: {n} bytes wanted, {remaining} left"
        )));
    }
    let mut buf = vec![0u8; n];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| BitcoinError::Format(format!("Failed to read {what}")))?;
    Ok(buf)
}

/// Read a single byte
pub fn read_u8(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| BitcoinError::Format(format!("Failed to read {what}")))?;
    Ok(buf[0])
}

/// Decode a little-endian integer of `nbytes` (at most 8) bytes
pub fn decode_int(cursor: &mut Cursor<&[u8]>, nbytes: usize) -> Result<u64> {
    debug_assert!(nbytes <= 8);
    let buf = read_bytes(cursor, nbytes, "int")?;
    Ok(buf
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &byte)| acc | ((byte as u64) << (i * 8))))
}

/// Encode a little-endian integer into `nbytes` bytes
pub fn encode_int(n: u64, nbytes: usize) -> Vec<u8> {
    (0..nbytes).map(|i| (n >> (i * 8)) as u8).collect()
}

/// Decode a variable-length integer
pub fn decode_varint(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    match read_u8(cursor, "varint")? {
        0xfd => decode_int(cursor, 2),
        0xfe => decode_int(cursor, 4),
        0xff => decode_int(cursor, 8),
        n => Ok(n as u64),
    }
}

/// Encode a variable-length integer.
/// Every `u64` fits in the 9-byte form, so this cannot fail.
pub fn encode_varint(n: u64) -> Vec<u8> {
    if n < 0xfd {
        vec![n as u8]
    } else if n < 0x10000 {
        let mut result = vec![0xfd];
        result.extend(encode_int(n, 2));
        result
    } else if n < 0x1_0000_0000 {
        let mut result = vec![0xfe];
        result.extend(encode_int(n, 4));
        result
    } else {
        let mut result = vec![0xff];
        result.extend(encode_int(n, 8));
        result
    }
}

// -----------------------------------------------------------------------------
// Base58 encoding/decoding

const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn alphabet_inv(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&x| x == c).map(|i| i as u8)
}

/// Base58 encode bytes; each leading zero byte becomes a leading '1'
pub fn encode_base58(bytes: &[u8]) -> String {
    let mut n = BigInt::from_bytes_be(Sign::Plus, bytes);
    let fifty_eight = BigInt::from(58);
    let mut chars = Vec::new();

    while !n.is_zero() {
        let (quotient, remainder) = n.div_rem(&fifty_eight);
        let idx = remainder.to_usize().unwrap_or_default();
        chars.push(ALPHABET[idx]);
        n = quotient;
    }

    let num_leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    chars.extend(std::iter::repeat_n(ALPHABET[0], num_leading_zeros));
    chars.reverse();
    chars.into_iter().map(char::from).collect()
}

/// Base58 decode to bytes; each leading '1' becomes a leading zero byte
pub fn decode_base58(s: &str) -> Result<Vec<u8>> {
    let fifty_eight = BigInt::from(58);
    let mut n = BigInt::zero();

    for c in s.bytes() {
        let val = alphabet_inv(c).ok_or_else(|| {
            BitcoinError::Format(format!("Invalid base58 character {:?}", c as char))
        })?;
        n = n * &fifty_eight + BigInt::from(val);
    }

    let num_leading_ones = s.bytes().take_while(|&c| c == b'1').count();
    let mut result = vec![0u8; num_leading_ones];
    if !n.is_zero() {
        result.extend(n.to_bytes_be().1);
    }
    Ok(result)
}

/// Base58 of `payload || first 4 bytes of hash256(payload)`
pub fn encode_base58check(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&hash256(payload)[..4]);
    encode_base58(&data)
}

/// Decode Base58Check text, verifying and stripping the checksum
pub fn decode_base58check(s: &str) -> Result<Vec<u8>> {
    let mut data = decode_base58(s)?;
    if data.len() < 4 {
        return Err(BitcoinError::Format("Base58Check data too short".into()));
    }
    let checksum = data.split_off(data.len() - 4);
    if hash256(&data)[..4] != checksum[..] {
        return Err(BitcoinError::Format("Invalid Base58Check checksum".into()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        assert_eq!(encode_varint(0), vec![0]);
        assert_eq!(encode_varint(252), vec![252]);
        assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
        assert_eq!(encode_varint(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(encode_varint(0x10000), vec![0xfe, 0, 0, 1, 0]);
        assert_eq!(encode_varint(0x1_0000_0000), vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_varint_decoding() {
        for n in [0u64, 100, 252, 253, 0xffff, 0x10000, 0xffff_ffff, u64::MAX] {
            let encoded = encode_varint(n);
            let mut cursor = Cursor::new(encoded.as_slice());
            assert_eq!(decode_varint(&mut cursor).unwrap(), n);
            assert_eq!(cursor.position() as usize, encoded.len());
        }
    }

    #[test]
    fn test_truncated_varint() {
        let data = [0xfdu8, 0x01];
        let mut cursor = Cursor::new(data.as_slice());
        assert!(matches!(decode_varint(&mut cursor), Err(BitcoinError::Format(_))));
    }

    #[test]
    fn test_read_bytes_checks_length_first() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(data.as_slice());
        assert!(matches!(
            read_bytes(&mut cursor, usize::MAX, "script"),
            Err(BitcoinError::Format(_))
        ));
        assert!(matches!(
            read_bytes(&mut cursor, 4, "script"),
            Err(BitcoinError::Format(_))
        ));
        // nothing was consumed by the failed reads
        assert_eq!(read_bytes(&mut cursor, 3, "script").unwrap(), data);
        assert_eq!(read_bytes(&mut cursor, 0, "script").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_little_endian_int() {
        assert_eq!(hex::encode(encode_int(500, 8)), "f401000000000000");
        let data = hex::decode("f4010000").unwrap();
        let mut cursor = Cursor::new(data.as_slice());
        assert_eq!(decode_int(&mut cursor, 4).unwrap(), 500);
    }

    #[test]
    fn test_encode_base58() {
        let tests = [
            (
                "7c076ff316692a3d7eb3c3bb0f8b1488cf72e1afcd929e29307032997a838a3d",
                "9MA8fRQrT4u8Zj8ZRd6MAiiyaxb2Y1CMpvVkHQu5hVM6",
            ),
            (
                "eff69ef2b1bd93a66ed5219add4fb51e11a840f404876325a1e8ffe0529a2c",
                "4fE3H2E6XMp4SsxtwinF7w9a34ooUrwWe4WsW1458Pd",
            ),
            (
                "c7207fee197d27c618aea621406f6bf5ef6fca38681d82b2f06fddbdce6feab6",
                "EQJsjkd6JaGwxrjEhfeqPenqHwrBmPQZjJGNSCHBkcF7",
            ),
        ];
        for (hex_str, expected) in tests {
            let bytes = hex::decode(hex_str).unwrap();
            assert_eq!(encode_base58(&bytes), expected);
            assert_eq!(decode_base58(expected).unwrap(), bytes);
        }
    }

    #[test]
    fn test_base58_leading_zeros() {
        let bytes = [0u8, 0, 1, 2];
        let encoded = encode_base58(&bytes);
        assert!(encoded.starts_with("11"));
        assert_eq!(decode_base58(&encoded).unwrap(), bytes);
        assert_eq!(encode_base58(&[0, 0]), "11");
        assert_eq!(decode_base58("11").unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_base58check() {
        let payload = hex::decode("00a802fc56c704ce87c42d7c92eb75e7896bdc41ae").unwrap();
        let encoded = encode_base58check(&payload);
        assert_eq!(decode_base58check(&encoded).unwrap(), payload);

        let mut corrupted = encoded.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert!(matches!(decode_base58check(&corrupted), Err(BitcoinError::Format(_))));
    }

    #[test]
    fn test_invalid_base58_character() {
        assert!(decode_base58("0OIl").is_err());
    }
}
