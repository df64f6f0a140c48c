//! ECDSA signature creation and verification
//!
//! Run with: cargo run --example sign_verify

use txverify::{PrivateKey, Signature, hash_message, verify};

fn verdict(valid: bool) -> &'static str {
    if valid { "VALID" } else { "INVALID" }
}

fn main() -> txverify::Result<()> {
    println!("=== ECDSA Sign & Verify ===\n");

    let alice = PrivateKey::generate()?;
    let bob = PrivateKey::generate()?;

    let message = b"Alice sends 1 BTC to Bob";
    println!("Message: {:?}\n", String::from_utf8_lossy(message));
    let z = hash_message(message);

    let signature = alice.sign(&z)?;
    let der = signature.der();
    println!("Signature (DER):");
    println!("  {}\n", hex::encode(&der));

    let parsed = Signature::parse(&der)?;
    println!("Verify with Alice's key: {}", verdict(verify(alice.point(), &z, &parsed)));

    let bob_sig = bob.sign(&z)?;
    println!(
        "Verify Bob's sig with Alice's key: {}",
        verdict(verify(alice.point(), &z, &bob_sig))
    );

    let tampered = hash_message(b"Alice sends 100 BTC to Bob");
    println!(
        "Verify tampered message: {}",
        verdict(verify(alice.point(), &tampered, &signature))
    );
    Ok(())
}
