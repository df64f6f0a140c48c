//! Generate Bitcoin keys and addresses
//!
//! Run with: cargo run --example keygen

use num_bigint::BigInt;
use txverify::{Network, PrivateKey};

fn main() -> txverify::Result<()> {
    println!("=== Bitcoin Key Generation ===\n");

    let key = PrivateKey::generate()?;
    let point = key.point();

    println!("Secret Key (hex):");
    println!("  {key}\n");

    println!("Public Key (compressed):");
    println!("  {}\n", hex::encode(point.sec(true)?));

    println!("Public Key (uncompressed):");
    println!("  {}\n", hex::encode(point.sec(false)?));

    println!("WIF:");
    println!("  Mainnet: {}", key.wif(true, Network::Main));
    println!("  Testnet: {}\n", key.wif(true, Network::Test));

    println!("Bitcoin Addresses:");
    println!("  Mainnet: {}", point.address(true, Network::Main)?);
    println!("  Testnet: {}", point.address(true, Network::Test)?);

    // Mastering Bitcoin example key
    println!("\n=== Known Key Derivation ===\n");
    let known = "3aba4162c7251c891207b747840551a71939b0de081f85c4e44cf7c13e41daa6";
    let secret = BigInt::parse_bytes(known.as_bytes(), 16).unwrap_or_default();
    let key = PrivateKey::new(secret)?;

    println!("Secret Key: {known}");
    println!("Address:    {}", key.point().address(true, Network::Main)?);
    println!("Expected:   14cxpo3MBCYYWCgF74SWTdcmxipnGUsPw3");
    Ok(())
}
