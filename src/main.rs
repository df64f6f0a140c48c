//! txverify command line
//!
//! ```text
//! txverify keygen [main|test]
//! txverify inspect <raw-tx-hex> [--testnet]
//! txverify verify <raw-tx-hex> [--testnet]
//! ```

use std::env;
use std::process::ExitCode;

use txverify::{CachingFetcher, HttpFetcher, Network, PrivateKey, Result, Tx};

fn keygen(network: Network) -> Result<()> {
    let key = PrivateKey::generate()?;
    println!("Secret key: {key}");
    println!("WIF:        {}", key.wif(true, network));
    println!("Public key: {}", hex::encode(key.point().sec(true)?));
    println!("Address:    {}", key.point().address(true, network)?);
    Ok(())
}

fn inspect(raw_hex: &str, testnet: bool) -> Result<()> {
    let tx = Tx::from_hex(raw_hex, testnet)?;
    println!("{tx}");
    if let Some(height) = tx.coinbase_height() {
        println!("coinbase height: {height}");
    }
    Ok(())
}

fn verify(raw_hex: &str, testnet: bool) -> Result<()> {
    let tx = Tx::from_hex(raw_hex, testnet)?;
    let fetcher = CachingFetcher::new(HttpFetcher::new()?);
    println!("fee: {} sat", tx.fee(&fetcher)?);
    tx.verify(&fetcher)?;
    println!("{} is valid", tx.id());
    Ok(())
}

fn usage() -> ExitCode {
    eprintln!("usage: txverify keygen [main|test]");
    eprintln!("       txverify inspect <raw-tx-hex> [--testnet]");
    eprintln!("       txverify verify <raw-tx-hex> [--testnet]");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let testnet = args.iter().any(|a| a == "--testnet");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    let result = match positional.as_slice() {
        ["keygen"] => keygen(Network::from_testnet(testnet)),
        ["keygen", network] => Network::try_from(*network).and_then(keygen),
        ["inspect", raw] => inspect(raw, testnet),
        ["verify", raw] => verify(raw, testnet),
        _ => return usage(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
