//! Looking up previous transactions by id
//!
//! Fee computation and signature hashing need the outputs an input spends.
//! They reach them through [`TxFetcher`], so verification can run against
//! an in-memory [`TxCache`] as easily as against a block explorer.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::{BitcoinError, Result};
use crate::transaction::Tx;

pub const MAINNET_API: &str = "https://blockstream.info/api";
pub const TESTNET_API: &str = "https://blockstream.info/testnet/api";

/// Source of previously confirmed transactions
pub trait TxFetcher {
    fn fetch(&self, tx_id: &str, testnet: bool) -> Result<Tx>;
}

fn normalize_id(tx_id: &str) -> Result<String> {
    if tx_id.len() != 64 || !tx_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BitcoinError::Fetch(format!("Invalid transaction ID: {tx_id}")));
    }
    Ok(tx_id.to_ascii_lowercase())
}

/// Transactions keyed by id. Entries never expire since confirmed
/// transactions are immutable.
#[derive(Debug, Default)]
pub struct TxCache {
    txs: RwLock<HashMap<String, Tx>>,
}

impl TxCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tx_id: &str) -> Option<Tx> {
        let txs = self.txs.read().unwrap_or_else(PoisonError::into_inner);
        txs.get(&tx_id.to_ascii_lowercase()).cloned()
    }

    /// Store `tx` under its own id, which is returned
    pub fn put(&self, tx: Tx) -> String {
        let id = tx.id();
        let mut txs = self.txs.write().unwrap_or_else(PoisonError::into_inner);
        txs.insert(id.clone(), tx);
        id
    }

    pub fn len(&self) -> usize {
        self.txs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TxFetcher for TxCache {
    fn fetch(&self, tx_id: &str, _testnet: bool) -> Result<Tx> {
        self.get(tx_id)
            .ok_or_else(|| BitcoinError::Fetch(format!("Transaction {tx_id} not in cache")))
    }
}

/// Memoizes another fetcher
#[derive(Debug)]
pub struct CachingFetcher<F> {
    inner: F,
    cache: TxCache,
}

impl<F: TxFetcher> CachingFetcher<F> {
    pub fn new(inner: F) -> Self {
        CachingFetcher {
            inner,
            cache: TxCache::new(),
        }
    }

    pub fn cache(&self) -> &TxCache {
        &self.cache
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: TxFetcher> TxFetcher for CachingFetcher<F> {
    fn fetch(&self, tx_id: &str, testnet: bool) -> Result<Tx> {
        if let Some(tx) = self.cache.get(tx_id) {
            log::debug!("cache hit for {tx_id}");
            return Ok(tx);
        }
        let tx = self.inner.fetch(tx_id, testnet)?;
        self.cache.put(tx.clone());
        Ok(tx)
    }
}

/// Fetches raw transactions from an Esplora-style REST API
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    mainnet_url: String,
    testnet_url: String,
}

impl HttpFetcher {
    /// Uses the blockstream.info endpoints
    pub fn new() -> Result<Self> {
        Self::with_base_urls(MAINNET_API, TESTNET_API)
    }

    pub fn with_base_urls(mainnet_url: &str, testnet_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BitcoinError::Fetch(e.to_string()))?;
        Ok(HttpFetcher {
            client,
            mainnet_url: mainnet_url.trim_end_matches('/').to_string(),
            testnet_url: testnet_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, tx_id: &str, testnet: bool) -> String {
        let base = if testnet {
            &self.testnet_url
        } else {
            &self.mainnet_url
        };
        format!("{base}/tx/{tx_id}/hex")
    }
}

impl TxFetcher for HttpFetcher {
    fn fetch(&self, tx_id: &str, testnet: bool) -> Result<Tx> {
        let tx_id = normalize_id(tx_id)?;
        let url = self.url(&tx_id, testnet);
        log::info!("fetching {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BitcoinError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BitcoinError::Fetch(format!(
                "Transaction {tx_id} not found ({})",
                response.status()
            )));
        }
        let body = response
            .text()
            .map_err(|e| BitcoinError::Fetch(e.to_string()))?;
        parse_response(&body, &tx_id, testnet)
    }
}

/// Turn a hex response body into the requested transaction. Witness data
/// is dropped, and anything wrong with the body is a fetch failure.
fn parse_response(body: &str, tx_id: &str, testnet: bool) -> Result<Tx> {
    let raw = hex::decode(body.trim())
        .map_err(|e| BitcoinError::Fetch(format!("Bad response for {tx_id}: {e}")))?;
    let tx = Tx::from_bytes_stripping_witness(&raw, testnet)
        .map_err(|e| BitcoinError::Fetch(format!("Bad response for {tx_id}: {e}")))?;
    if tx.id() != tx_id {
        return Err(BitcoinError::Fetch(format!(
            "Transaction ID mismatch: requested {tx_id}, got {}",
            tx.id()
        )));
    }
    Ok(tx)
}
