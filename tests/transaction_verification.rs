//! End-to-end transaction verification against an in-memory fetcher

use num_bigint::BigInt;
use txverify::{
    BitcoinError, CachingFetcher, PrivateKey, Tx, TxCache, TxFetcher, TxIn, TxOut, p2pkh_script,
};

const RAW_TX: &str = "0100000001813f79011acb80925dfe69b3def355fe914bd1d96a3f5f71bf8303c6a989c7d1000000006b483045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d955c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278afeffffff02a135ef01000000001976a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada88ac99c39800000000001976a9141c4bc762dd5423e332166702cb75f40df79fea1288ac19430600";

const PREV_TX: &str = "0100000002137c53f0fb48f83666fcfd2fe9f12d13e94ee109c5aeabbfa32bb9e02538f4cb000000006a47304402207e6009ad86367fc4b166bc80bf10cf1e78832a01e9bb491c6d126ee8aa436cb502200e29e6dd7708ed419cd5ba798981c960f0cc811b24e894bff072fea8074a7c4c012103bc9e7397f739c70f424aa7dcce9d2e521eb228b0ccba619cd6a0b9691da796a1ffffffff517472e77bc29ae59a914f55211f05024556812a2dd7d8df293265acd8330159010000006b483045022100f4bfdb0b3185c778cf28acbaf115376352f091ad9e27225e6f3f350b847579c702200d69177773cd2bb993a816a5ae08e77a6270cf46b33f8f79d45b0cd1244d9c4c0121031c0b0b95b522805ea9d0225b1946ecaeb1727c0b36c7e34165769fd8ed860bf5ffffffff027a958802000000001976a914a802fc56c704ce87c42d7c92eb75e7896bdc41ae88aca5515e00000000001976a914e82bd75c9c662c3f5700b33fec8a676b6e9391d588ac00000000";

fn known_chain() -> (Tx, TxCache) {
    let cache = TxCache::new();
    cache.put(Tx::from_hex(PREV_TX, false).unwrap());
    (Tx::from_hex(RAW_TX, false).unwrap(), cache)
}

/// A funding transaction paying `amounts[i]` to `keys[i]`, plus a spend of
/// all of its outputs into a single output of `spend_amount`
fn two_party_spend(keys: &[PrivateKey], amounts: &[u64], spend_amount: u64) -> (Tx, TxCache) {
    let outputs = keys
        .iter()
        .zip(amounts)
        .map(|(key, &amount)| TxOut::new(amount, p2pkh_script(&key.point().hash160(true).unwrap())))
        .collect();
    let funding = Tx::new(1, vec![TxIn::new([0x5a; 32], 0)], outputs, 0, true);

    let cache = TxCache::new();
    cache.put(funding.clone());

    let inputs = (0..keys.len() as u32)
        .map(|index| TxIn::new(funding.hash(), index))
        .collect();
    let spend = Tx::new(
        1,
        inputs,
        vec![TxOut::new(spend_amount, p2pkh_script(&[0x33; 20]))],
        0,
        true,
    );
    (spend, cache)
}

fn keys() -> Vec<PrivateKey> {
    vec![
        PrivateKey::new(BigInt::from(0xa11ceu64)).unwrap(),
        PrivateKey::new(BigInt::from(0xb0bu64)).unwrap(),
    ]
}

#[test]
fn known_transaction_verifies() {
    let (tx, cache) = known_chain();

    assert_eq!(tx.fee(&cache).unwrap(), 40000);
    assert_eq!(
        format!("{:064x}", tx.sig_hash(0, &cache).unwrap()),
        "27e0c5994dec7824e56dec6b2fcb342eb7cdb0d0957c2fce9882f715e85d81a6"
    );
    tx.verify(&cache).unwrap();
}

#[test]
fn caching_fetcher_in_front_of_cache() {
    let (tx, cache) = known_chain();
    let fetcher = CachingFetcher::new(cache);

    tx.verify(&fetcher).unwrap();
    assert_eq!(fetcher.cache().len(), 1);
    assert!(fetcher.fetch(&tx.tx_ins[0].prev_tx_id(), false).is_ok());
}

#[test]
fn fetcher_trait_object() {
    let (tx, cache) = known_chain();
    let fetcher: &dyn TxFetcher = &cache;
    assert_eq!(tx.fee(fetcher).unwrap(), 40000);
    tx.verify(fetcher).unwrap();
}

#[test]
fn two_input_transaction_signs_and_verifies() {
    let keys = keys();
    let (mut spend, cache) = two_party_spend(&keys, &[60_000, 40_000], 99_000);

    spend.sign_input(0, &keys[0], true, &cache).unwrap();
    spend.sign_input(1, &keys[1], true, &cache).unwrap();

    // signing input 1 leaves input 0's signature intact
    spend.verify_input(0, &cache).unwrap();
    spend.verify(&cache).unwrap();
    assert_eq!(spend.fee(&cache).unwrap(), 1_000);

    // both inputs are part of each preimage
    assert_ne!(
        spend.sig_hash(0, &cache).unwrap(),
        spend.sig_hash(1, &cache).unwrap()
    );

    let round_tripped = Tx::from_bytes(&spend.serialize(), true).unwrap();
    assert_eq!(round_tripped, spend);
    round_tripped.verify(&cache).unwrap();
}

#[test]
fn other_input_sequence_is_committed() {
    let keys = keys();
    let (mut spend, cache) = two_party_spend(&keys, &[60_000, 40_000], 99_000);
    spend.sign_input(0, &keys[0], true, &cache).unwrap();
    spend.sign_input(1, &keys[1], true, &cache).unwrap();

    spend.tx_ins[1].sequence = 0xfffffffe;
    assert!(spend.verify_input(0, &cache).is_err());
    assert!(matches!(
        spend.verify(&cache),
        Err(BitcoinError::InvalidTransaction(_))
    ));
}

#[test]
fn uncompressed_keys_sign_too() {
    let key = PrivateKey::new(BigInt::from(2020u32).pow(5)).unwrap();
    let funding = Tx::new(
        1,
        vec![TxIn::new([0x01; 32], 1)],
        vec![TxOut::new(10_000, p2pkh_script(&key.point().hash160(false).unwrap()))],
        0,
        false,
    );
    let cache = TxCache::new();
    cache.put(funding.clone());

    let mut spend = Tx::new(
        1,
        vec![TxIn::new(funding.hash(), 0)],
        vec![TxOut::new(9_000, p2pkh_script(&[0x44; 20]))],
        0,
        false,
    );
    spend.sign_input(0, &key, false, &cache).unwrap();
    spend.verify(&cache).unwrap();

    // a compressed key hashes differently and fails the p2pkh check
    assert!(spend.sign_input(0, &key, true, &cache).is_err());
}

#[test]
fn overspending_is_invalid() {
    let keys = keys();
    let (mut spend, cache) = two_party_spend(&keys, &[1_000, 2_000], 5_000);
    spend.sign_input(0, &keys[0], true, &cache).unwrap();
    spend.sign_input(1, &keys[1], true, &cache).unwrap();

    assert_eq!(spend.fee(&cache).unwrap(), -2_000);
    let err = spend.verify(&cache).unwrap_err();
    assert!(matches!(err, BitcoinError::InvalidTransaction(_)));
    assert!(err.is_invalid_spend());
}

#[test]
fn output_larger_than_any_fee_is_invalid() {
    let keys = keys();
    let (mut spend, cache) = two_party_spend(&keys[..1], &[50_000], u64::MAX);
    spend.sign_input(0, &keys[0], true, &cache).unwrap();

    assert!(matches!(
        spend.fee(&cache),
        Err(BitcoinError::InvalidTransaction(_))
    ));
    let err = spend.verify(&cache).unwrap_err();
    assert!(matches!(err, BitcoinError::InvalidTransaction(_)));
    assert!(err.is_invalid_spend());
}

#[test]
fn unsigned_input_is_invalid() {
    let keys = keys();
    let (mut spend, cache) = two_party_spend(&keys, &[60_000, 40_000], 99_000);
    spend.sign_input(0, &keys[0], true, &cache).unwrap();

    // input 1 still has an empty scriptSig, so OP_DUP has nothing to copy
    assert!(matches!(
        spend.verify(&cache),
        Err(BitcoinError::InvalidTransaction(_))
    ));
}

#[test]
fn missing_previous_transaction_is_a_fetch_error() {
    let (tx, _) = known_chain();
    let err = tx.verify(&TxCache::new()).unwrap_err();
    assert!(matches!(err, BitcoinError::Fetch(_)));
    assert!(!err.is_invalid_spend());
}
