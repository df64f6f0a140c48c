//! The Transaction object in Bitcoin
//! Reference: https://en.bitcoin.it/wiki/Transaction

use std::fmt;
use std::io::Cursor;

use num_bigint::{BigInt, Sign};

use crate::encoding::{decode_int, decode_varint, encode_int, encode_varint, read_bytes, read_u8};
use crate::error::{BitcoinError, Result};
use crate::fetcher::TxFetcher;
use crate::hash::hash256;
use crate::keys::PrivateKey;
use crate::script::{Command, Script};

/// Sign all inputs and outputs
pub const SIGHASH_ALL: u32 = 1;

/// Bitcoin Transaction (legacy serialization)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    pub version: u32,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
    pub locktime: u32,
    pub testnet: bool,
}

impl Tx {
    pub fn new(
        version: u32,
        tx_ins: Vec<TxIn>,
        tx_outs: Vec<TxOut>,
        locktime: u32,
        testnet: bool,
    ) -> Self {
        Tx {
            version,
            tx_ins,
            tx_outs,
            locktime,
            testnet,
        }
    }

    /// Parse a transaction from the stream
    pub fn parse(cursor: &mut Cursor<&[u8]>, testnet: bool) -> Result<Self> {
        Self::decode(cursor, testnet, false)
    }

    fn decode(cursor: &mut Cursor<&[u8]>, testnet: bool, allow_witness: bool) -> Result<Self> {
        let version = decode_int(cursor, 4)? as u32;

        let mut num_inputs = decode_varint(cursor)?;
        let segwit = num_inputs == 0;
        if segwit {
            // a zero count is the segwit marker
            if !allow_witness {
                return Err(BitcoinError::Format(
                    "Segwit serialization is not supported".into(),
                ));
            }
            if read_u8(cursor, "segwit flag")? != 1 {
                return Err(BitcoinError::Format("Invalid segwit flag".into()));
            }
            num_inputs = decode_varint(cursor)?;
        }

        let mut tx_ins = Vec::new();
        for _ in 0..num_inputs {
            tx_ins.push(TxIn::parse(cursor)?);
        }

        let num_outputs = decode_varint(cursor)?;
        let mut tx_outs = Vec::new();
        for _ in 0..num_outputs {
            tx_outs.push(TxOut::parse(cursor)?);
        }

        if segwit {
            for _ in &tx_ins {
                skip_witness(cursor)?;
            }
        }

        let locktime = decode_int(cursor, 4)? as u32;

        Ok(Tx {
            version,
            tx_ins,
            tx_outs,
            locktime,
            testnet,
        })
    }

    /// Parse a transaction that must span all of `raw`
    pub fn from_bytes(raw: &[u8], testnet: bool) -> Result<Self> {
        Self::decode_exact(raw, testnet, false)
    }

    /// [`Tx::from_bytes`] accepting either serialization. Witness data is
    /// dropped; the result keeps the original txid, which is all a
    /// previous transaction is needed for.
    pub fn from_bytes_stripping_witness(raw: &[u8], testnet: bool) -> Result<Self> {
        Self::decode_exact(raw, testnet, true)
    }

    fn decode_exact(raw: &[u8], testnet: bool, allow_witness: bool) -> Result<Self> {
        let mut cursor = Cursor::new(raw);
        let tx = Self::decode(&mut cursor, testnet, allow_witness)?;
        if cursor.position() as usize != raw.len() {
            return Err(BitcoinError::Format(format!(
                "{} trailing bytes after transaction",
                raw.len() - cursor.position() as usize
            )));
        }
        Ok(tx)
    }

    pub fn from_hex(hex_str: &str, testnet: bool) -> Result<Self> {
        let raw = hex::decode(hex_str.trim())?;
        Self::from_bytes(&raw, testnet)
    }

    /// Serialize the transaction
    pub fn serialize(&self) -> Vec<u8> {
        self.encode(|_, tx_in| tx_in.script_sig.serialize())
    }

    /// Shared layout of `serialize` and the signature-hash preimage.
    /// `script_for` chooses what goes in each input's script slot.
    fn encode<F>(&self, mut script_for: F) -> Vec<u8>
    where
        F: FnMut(usize, &TxIn) -> Vec<u8>,
    {
        let mut out = encode_int(self.version as u64, 4);

        out.extend(encode_varint(self.tx_ins.len() as u64));
        for (index, tx_in) in self.tx_ins.iter().enumerate() {
            let script = script_for(index, tx_in);
            out.extend(tx_in.encode_with_script(&script));
        }

        out.extend(encode_varint(self.tx_outs.len() as u64));
        for tx_out in &self.tx_outs {
            out.extend(tx_out.serialize());
        }

        out.extend(encode_int(self.locktime as u64, 4));
        out
    }

    /// Binary hash of the serialization, in display order
    pub fn hash(&self) -> [u8; 32] {
        let mut hash = hash256(&self.serialize());
        hash.reverse();
        hash
    }

    /// Human-readable hexadecimal of the transaction hash
    pub fn id(&self) -> String {
        hex::encode(self.hash())
    }

    /// Sum of spent amounts minus sum of created amounts, in satoshis.
    /// Totals that overflow `u64`, or a difference outside `i64`, make the
    /// transaction invalid.
    pub fn fee<F: TxFetcher + ?Sized>(&self, fetcher: &F) -> Result<i64> {
        let mut input_total: u64 = 0;
        for tx_in in &self.tx_ins {
            input_total = input_total
                .checked_add(tx_in.value(fetcher, self.testnet)?)
                .ok_or_else(|| BitcoinError::InvalidTransaction("input total overflows".into()))?;
        }
        let output_total = self
            .tx_outs
            .iter()
            .try_fold(0u64, |acc, tx_out| acc.checked_add(tx_out.amount))
            .ok_or_else(|| BitcoinError::InvalidTransaction("output total overflows".into()))?;

        i64::try_from(i128::from(input_total) - i128::from(output_total)).map_err(|_| {
            BitcoinError::InvalidTransaction(format!(
                "fee out of range: {input_total} in, {output_total} out"
            ))
        })
    }

    /// Legacy SIGHASH_ALL digest for the input at `input_index`.
    ///
    /// The signed input carries the locking script of the output it
    /// spends, every other input an empty script.
    pub fn sig_hash<F: TxFetcher + ?Sized>(&self, input_index: usize, fetcher: &F) -> Result<BigInt> {
        let locking = self
            .input(input_index)?
            .locking_script(fetcher, self.testnet)?
            .serialize();
        let empty = Script::empty().serialize();

        let mut preimage = self.encode(|index, _| {
            if index == input_index {
                locking.clone()
            } else {
                empty.clone()
            }
        });
        preimage.extend(encode_int(SIGHASH_ALL as u64, 4));

        Ok(BigInt::from_bytes_be(Sign::Plus, &hash256(&preimage)))
    }

    /// Evaluate scriptSig + previous scriptPubKey for one input
    pub fn verify_input<F: TxFetcher + ?Sized>(&self, input_index: usize, fetcher: &F) -> Result<()> {
        let tx_in = self.input(input_index)?;
        let locking = tx_in.locking_script(fetcher, self.testnet)?;
        let z = self.sig_hash(input_index, fetcher)?;
        let combined = &tx_in.script_sig + &locking;

        log::debug!("verifying input {input_index} of {}: {combined}", self.id());
        combined.evaluate(&z)
    }

    /// Verify the whole transaction.
    ///
    /// A negative fee or any failing input makes the transaction invalid.
    /// Fetch and format failures propagate unchanged.
    pub fn verify<F: TxFetcher + ?Sized>(&self, fetcher: &F) -> Result<()> {
        if self.is_coinbase() {
            return Err(BitcoinError::InvalidTransaction(
                "coinbase transactions cannot be verified without block context".into(),
            ));
        }

        let fee = self.fee(fetcher)?;
        if fee < 0 {
            log::warn!("transaction {} has negative fee {fee}", self.id());
            return Err(BitcoinError::InvalidTransaction(format!("negative fee {fee}")));
        }

        for index in 0..self.tx_ins.len() {
            match self.verify_input(index, fetcher) {
                Ok(()) => {}
                Err(e) if e.is_invalid_spend() => {
                    log::warn!("input {index} of {} failed: {e}", self.id());
                    return Err(BitcoinError::InvalidTransaction(format!("input {index}: {e}")));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sign a p2pkh input with `key`, replacing its scriptSig, then check it
    pub fn sign_input<F: TxFetcher + ?Sized>(
        &mut self,
        input_index: usize,
        key: &PrivateKey,
        compressed: bool,
        fetcher: &F,
    ) -> Result<()> {
        let z = self.sig_hash(input_index, fetcher)?;
        let mut sig = key.sign(&z)?.der();
        sig.push(SIGHASH_ALL as u8);
        let sec = key.point().sec(compressed)?;

        self.tx_ins[input_index].script_sig = Script::new(vec![Command::Data(sig), Command::Data(sec)]);
        self.verify_input(input_index, fetcher)
    }

    /// One input spending the null outpoint
    pub fn is_coinbase(&self) -> bool {
        match self.tx_ins.as_slice() {
            [only] => only.prev_tx == [0u8; 32] && only.prev_index == 0xffffffff,
            _ => false,
        }
    }

    /// Block height from the coinbase scriptSig (BIP34)
    pub fn coinbase_height(&self) -> Option<u32> {
        if !self.is_coinbase() {
            return None;
        }
        match self.tx_ins[0].script_sig.cmds.first() {
            Some(Command::Data(data)) if data.len() <= 4 => Some(
                data.iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, &byte)| acc | ((byte as u32) << (i * 8))),
            ),
            _ => None,
        }
    }

    fn input(&self, index: usize) -> Result<&TxIn> {
        self.tx_ins.get(index).ok_or_else(|| {
            BitcoinError::InvalidTransaction(format!(
                "input index {index} out of range ({} inputs)",
                self.tx_ins.len()
            ))
        })
    }
}

/// Consume one input's witness stack
fn skip_witness(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    let num_items = decode_varint(cursor)?;
    for _ in 0..num_items {
        let len = decode_varint(cursor)?;
        let len = usize::try_from(len)
            .map_err(|_| BitcoinError::Format(format!("Witness item length {len} too large")))?;
        read_bytes(cursor, len, "witness item")?;
    }
    Ok(())
}

impl fmt::Display for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tx: {}", self.id())?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "tx_ins:")?;
        for tx_in in &self.tx_ins {
            writeln!(f, "{tx_in}")?;
        }
        writeln!(f, "tx_outs:")?;
        for tx_out in &self.tx_outs {
            writeln!(f, "{tx_out}")?;
        }
        write!(f, "locktime: {}", self.locktime)
    }
}

/// Transaction Input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// Previous transaction hash in display (big-endian) order
    pub prev_tx: [u8; 32],
    pub prev_index: u32,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    /// An unsigned input with the final sequence number
    pub fn new(prev_tx: [u8; 32], prev_index: u32) -> Self {
        TxIn {
            prev_tx,
            prev_index,
            script_sig: Script::empty(),
            sequence: 0xffffffff,
        }
    }

    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let mut prev_tx = [0u8; 32];
        prev_tx.copy_from_slice(&read_bytes(cursor, 32, "previous transaction hash")?);
        prev_tx.reverse();

        let prev_index = decode_int(cursor, 4)? as u32;
        let script_sig = Script::parse(cursor)?;
        let sequence = decode_int(cursor, 4)? as u32;

        Ok(TxIn {
            prev_tx,
            prev_index,
            script_sig,
            sequence,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.encode_with_script(&self.script_sig.serialize())
    }

    /// Outpoint, the given length-prefixed script, then the sequence
    fn encode_with_script(&self, script: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(40 + script.len());
        out.extend(self.prev_tx.iter().rev());
        out.extend(encode_int(self.prev_index as u64, 4));
        out.extend_from_slice(script);
        out.extend(encode_int(self.sequence as u64, 4));
        out
    }

    pub fn prev_tx_id(&self) -> String {
        hex::encode(self.prev_tx)
    }

    /// The output this input spends
    pub fn prev_output<F: TxFetcher + ?Sized>(&self, fetcher: &F, testnet: bool) -> Result<TxOut> {
        let tx_id = self.prev_tx_id();
        let prev = fetcher.fetch(&tx_id, testnet)?;
        prev.tx_outs
            .get(self.prev_index as usize)
            .cloned()
            .ok_or_else(|| {
                BitcoinError::Fetch(format!(
                    "transaction {tx_id} has no output {}",
                    self.prev_index
                ))
            })
    }

    /// Amount of the spent output
    pub fn value<F: TxFetcher + ?Sized>(&self, fetcher: &F, testnet: bool) -> Result<u64> {
        Ok(self.prev_output(fetcher, testnet)?.amount)
    }

    /// Locking script of the spent output
    pub fn locking_script<F: TxFetcher + ?Sized>(&self, fetcher: &F, testnet: bool) -> Result<Script> {
        Ok(self.prev_output(fetcher, testnet)?.script_pubkey)
    }
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prev_tx_id(), self.prev_index)
    }
}

/// Transaction Output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Satoshis
    pub amount: u64,
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(amount: u64, script_pubkey: Script) -> Self {
        TxOut {
            amount,
            script_pubkey,
        }
    }

    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let amount = decode_int(cursor, 8)?;
        let script_pubkey = Script::parse(cursor)?;
        Ok(TxOut {
            amount,
            script_pubkey,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = encode_int(self.amount, 8);
        out.extend(self.script_pubkey.serialize());
        out
    }
}

impl fmt::Display for TxOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.amount, self.script_pubkey)
    }
}
