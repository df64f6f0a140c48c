//! Parse, inspect and verify a Bitcoin transaction offline
//!
//! Run with: cargo run --example parse_tx

use txverify::{Tx, TxCache};

const LEGACY_TX: &str = "0100000001813f79011acb80925dfe69b3def355fe914bd1d96a3f5f71bf8303c6a989c7d1000000006b483045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d955c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278afeffffff02a135ef01000000001976a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada88ac99c39800000000001976a9141c4bc762dd5423e332166702cb75f40df79fea1288ac19430600";

// The transaction whose first output LEGACY_TX spends
const PREV_TX: &str = "0100000002137c53f0fb48f83666fcfd2fe9f12d13e94ee109c5aeabbfa32bb9e02538f4cb000000006a47304402207e6009ad86367fc4b166bc80bf10cf1e78832a01e9bb491c6d126ee8aa436cb502200e29e6dd7708ed419cd5ba798981c960f0cc811b24e894bff072fea8074a7c4c012103bc9e7397f739c70f424aa7dcce9d2e521eb228b0ccba619cd6a0b9691da796a1ffffffff517472e77bc29ae59a914f55211f05024556812a2dd7d8df293265acd8330159010000006b483045022100f4bfdb0b3185c778cf28acbaf115376352f091ad9e27225e6f3f350b847579c702200d69177773cd2bb993a816a5ae08e77a6270cf46b33f8f79d45b0cd1244d9c4c0121031c0b0b95b522805ea9d0225b1946ecaeb1727c0b36c7e34165769fd8ed860bf5ffffffff027a958802000000001976a914a802fc56c704ce87c42d7c92eb75e7896bdc41ae88aca5515e00000000001976a914e82bd75c9c662c3f5700b33fec8a676b6e9391d588ac00000000";

const COINBASE_TX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff5e03d71b07254d696e656420627920416e74506f6f6c20626a31312f4542312f4144362f43205914293101fabe6d6d678e2c8c34afc36896e7d9402824ed38e856676ee94bfdb0c6c4bcd8b2e5666a0400000000000000c7270000a5e00e00ffffffff01faf20b58000000001976a914338c84849423992471bffb1a54a8d9b1d69dc28a88ac00000000";

fn main() -> txverify::Result<()> {
    println!("=== Parse Bitcoin Transaction ===\n");

    let tx = Tx::from_hex(LEGACY_TX, false)?;

    println!("Transaction ID: {}", tx.id());
    println!("Version: {}", tx.version);
    println!("Locktime: {}", tx.locktime);

    println!("\nInputs ({}):", tx.tx_ins.len());
    for (i, input) in tx.tx_ins.iter().enumerate() {
        println!("  [{i}] prev_tx: {input}");
        println!("      sequence: 0x{:08x}", input.sequence);
        println!("      script_sig: {}", input.script_sig);
    }

    println!("\nOutputs ({}):", tx.tx_outs.len());
    for (i, output) in tx.tx_outs.iter().enumerate() {
        let btc = output.amount as f64 / 100_000_000.0;
        println!("  [{i}] {} satoshis ({btc:.8} BTC)", output.amount);
        println!("      script: {}", output.script_pubkey);
    }

    // Previous transaction supplied locally instead of over the network
    let cache = TxCache::new();
    cache.put(Tx::from_hex(PREV_TX, false)?);

    println!("\nFee: {} satoshis", tx.fee(&cache)?);
    println!("Sighash(0): {:064x}", tx.sig_hash(0, &cache)?);
    match tx.verify(&cache) {
        Ok(()) => println!("Verification: VALID"),
        Err(e) => println!("Verification: INVALID ({e})"),
    }

    println!("\n=== Coinbase Transaction ===\n");
    let coinbase = Tx::from_hex(COINBASE_TX, false)?;

    println!("Is Coinbase: {}", coinbase.is_coinbase());
    println!("Block Height: {:?}", coinbase.coinbase_height());

    let reward = coinbase.tx_outs[0].amount as f64 / 100_000_000.0;
    println!("Block Reward: {reward:.8} BTC");
    Ok(())
}
