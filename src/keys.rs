//! Private keys, secret generation, WIF and the network selector

use num_bigint::{BigInt, Sign};
use num_traits::One;
use rand::RngCore;

use crate::ecdsa::{self, Signature};
use crate::encoding::{decode_base58check, encode_base58check};
use crate::error::{BitcoinError, Result};
use crate::secp256k1::{S256Point, SECP256K1, to_bytes32};

/// Bitcoin network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Main,
    Test,
}

impl Network {
    pub const fn from_testnet(testnet: bool) -> Self {
        if testnet { Network::Test } else { Network::Main }
    }

    #[inline]
    pub const fn is_testnet(self) -> bool {
        matches!(self, Network::Test)
    }

    /// Version byte for P2PKH addresses
    #[inline]
    pub const fn version_byte(self) -> u8 {
        match self {
            Network::Main => 0x00,
            Network::Test => 0x6f,
        }
    }

    /// Version byte for WIF private keys
    #[inline]
    pub const fn wif_prefix(self) -> u8 {
        match self {
            Network::Main => 0x80,
            Network::Test => 0xef,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl TryFrom<&str> for Network {
    type Error = BitcoinError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            _ => Err(BitcoinError::Format(format!("Unknown network: {s}"))),
        }
    }
}

/// Generate a secret key with uniform random distribution in [1, n)
pub fn gen_secret_key(n: &BigInt) -> BigInt {
    let mut rng = rand::rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let key = BigInt::from_bytes_be(Sign::Plus, &bytes);
        if key >= BigInt::one() && key < *n {
            return key;
        }
    }
}

/// A signing secret together with its public point `secret * G`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: BigInt,
    point: S256Point,
}

impl PrivateKey {
    /// Requires `1 <= secret < N`
    pub fn new(secret: BigInt) -> Result<Self> {
        let n = &SECP256K1.n;
        if secret < BigInt::one() || &secret >= n {
            return Err(BitcoinError::ValueOutOfRange {
                value: secret.to_string(),
                modulus: n.to_string(),
            });
        }
        let point = (&secret * &S256Point::generator())?;
        Ok(PrivateKey { secret, point })
    }

    /// A fresh random key
    pub fn generate() -> Result<Self> {
        Self::new(gen_secret_key(&SECP256K1.n))
    }

    #[inline]
    pub fn secret(&self) -> &BigInt {
        &self.secret
    }

    #[inline]
    pub fn point(&self) -> &S256Point {
        &self.point
    }

    pub fn sign(&self, z: &BigInt) -> Result<Signature> {
        ecdsa::sign(&self.secret, z)
    }

    pub fn sign_with_nonce(&self, z: &BigInt, k: &BigInt) -> Result<Signature> {
        ecdsa::sign_with_nonce(&self.secret, z, k)
    }

    /// Wallet Import Format: `prefix || secret(32) || [0x01]`
    pub fn wif(&self, compressed: bool, network: Network) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(network.wif_prefix());
        payload.extend_from_slice(&to_bytes32(&self.secret));
        if compressed {
            payload.push(0x01);
        }
        encode_base58check(&payload)
    }

    /// Decode a WIF string into the key, its compression flag and network
    pub fn from_wif(wif: &str) -> Result<(Self, bool, Network)> {
        let payload = decode_base58check(wif)?;
        let network = match payload.first().copied() {
            Some(0x80) => Network::Main,
            Some(0xef) => Network::Test,
            _ => return Err(BitcoinError::Format("Unknown WIF version byte".into())),
        };
        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == 0x01 => true,
            _ => return Err(BitcoinError::Format("Invalid WIF payload length".into())),
        };
        let secret = BigInt::from_bytes_be(Sign::Plus, &payload[1..33]);
        Ok((Self::new(secret)?, compressed, network))
    }
}

impl std::fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:064x}", self.secret)
    }
}

/// Extract the HASH160 payload of a Base58Check P2PKH address
pub fn address_to_hash160(address: &str) -> Result<[u8; 20]> {
    let payload = decode_base58check(address)?;
    if payload.len() != 21 {
        return Err(BitcoinError::Format("Invalid address length".into()));
    }
    if payload[0] != Network::Main.version_byte() && payload[0] != Network::Test.version_byte() {
        return Err(BitcoinError::Format("Unknown address version byte".into()));
    }
    let mut h160 = [0u8; 20];
    h160.copy_from_slice(&payload[1..]);
    Ok(h160)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wif() {
        let tests = [
            (BigInt::from(5003), true, Network::Test, "cMahea7zqjxrtgAbB7LSGbcQUr1uX1ojuat9jZodMN8rFTv2sfUK"),
            (BigInt::from(2021).pow(5), false, Network::Test, "91avARGdfge8E4tZfYLoxeJ5sGBdNJQH4kvjpWAxgzczjbCwxic"),
            (
                BigInt::parse_bytes(b"54321deadbeef", 16).unwrap(),
                true,
                Network::Main,
                "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgiuQJv1h8Ytr2S53a",
            ),
        ];
        for (secret, compressed, network, expected) in tests {
            let key = PrivateKey::new(secret).unwrap();
            assert_eq!(key.wif(compressed, network), expected);

            let (decoded, was_compressed, net) = PrivateKey::from_wif(expected).unwrap();
            assert_eq!(decoded, key);
            assert_eq!(was_compressed, compressed);
            assert_eq!(net, network);
        }
    }

    #[test]
    fn test_secret_range() {
        assert!(PrivateKey::new(BigInt::from(0)).is_err());
        assert!(PrivateKey::new(SECP256K1.n.clone()).is_err());
        assert!(PrivateKey::new(&SECP256K1.n - BigInt::one()).is_ok());
    }

    #[test]
    fn test_key_generation() {
        let key = PrivateKey::generate().unwrap();
        assert!(*key.secret() >= BigInt::one());
        assert!(*key.secret() < SECP256K1.n);
        assert!(!key.point().is_infinity());
    }

    #[test]
    fn test_address_to_hash160() {
        let secret = BigInt::parse_bytes(
            b"3aba4162c7251c891207b747840551a71939b0de081f85c4e44cf7c13e41daa6",
            16,
        )
        .unwrap();
        let key = PrivateKey::new(secret).unwrap();
        let address = key.point().address(true, Network::Main).unwrap();
        assert_eq!(address_to_hash160(&address).unwrap(), key.point().hash160(true).unwrap());
        assert_eq!(address_to_hash160("1111111111111111111114oLvT2").unwrap(), [0u8; 20]);
        assert!(address_to_hash160("1111111111111111111114oLvT3").is_err());
    }

    #[test]
    fn test_network_names() {
        assert_eq!(Network::try_from("testnet").unwrap(), Network::Test);
        assert_eq!(Network::try_from("main").unwrap(), Network::Main);
        assert!(Network::try_from("regtest").is_err());
        assert_eq!(Network::from_testnet(true).name(), "test");
    }
}
