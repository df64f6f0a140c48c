//! Hash functions used by Bitcoin, as thin wrappers over the RustCrypto crates

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256 (used for transaction ids, sighashes and checksums)
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute RIPEMD-160 hash
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD160(SHA256(x)), used for addresses and p2pkh scripts
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Compute SHA-1 hash (only reachable through OP_SHA1)
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_vectors() {
        let test_cases = [
            (
                b"".as_slice(),
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
            (
                b"abc".as_slice(),
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            ),
        ];

        for (input, expected) in test_cases {
            assert_eq!(hex::encode(sha256(input)), expected);
        }
    }

    #[test]
    fn test_hash256() {
        let first = sha256(b"hello");
        assert_eq!(hash256(b"hello"), sha256(&first));
    }

    #[test]
    fn test_ripemd160_and_hash160() {
        assert_eq!(
            hex::encode(ripemd160(b"")),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
        // Compressed SEC key from the chapter 5 transaction fixture
        let sec = hex::decode("0349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278a")
            .unwrap();
        assert_eq!(
            hex::encode(hash160(&sec)),
            "a802fc56c704ce87c42d7c92eb75e7896bdc41ae"
        );
    }

    #[test]
    fn test_sha1() {
        assert_eq!(
            hex::encode(sha1(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }
}
