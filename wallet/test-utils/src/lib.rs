// Copyright (c) 2024 Botho Foundation

//! An in-memory [`Wallet`] for tests.
//!
//! Transaction payloads are the JSON form of [`DecodedTransaction`]; build
//! them with [`mock_transaction`]. Signing appends a marker naming the
//! accounts so tests can see that a payload went through the wallet.

use cosign_wallet::{
    DecodedTransaction, HistoricalTransaction, TransactionDecoder, Wallet, WalletError,
    WalletResult,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

/// Encode a payload the mock decoder understands.
pub fn mock_transaction(amount: u64, from_addresses: &[&str], timestamp: u64) -> String {
    let tx = DecodedTransaction {
        amount,
        from_addresses: from_addresses.iter().map(|a| a.to_string()).collect(),
        timestamp,
    };
    serde_json::to_string(&tx).expect("DecodedTransaction always serializes")
}

/// The payload `MockWallet::sign` returns for `payload` and `account_ids`.
pub fn mock_signature(payload: &str, account_ids: &[String]) -> String {
    format!("{payload}|signed-by:{}", account_ids.join(","))
}

/// Decoding half of the mock, holding per-address history.
#[derive(Debug, Default)]
pub struct MockChain {
    history: Mutex<HashMap<String, Vec<HistoricalTransaction>>>,
    history_error: Option<String>,
}

impl TransactionDecoder for MockChain {
    fn decode_transaction(&self, payload: &str) -> WalletResult<DecodedTransaction> {
        serde_json::from_str(payload).map_err(|e| WalletError::Decode(e.to_string()))
    }

    fn history(
        &self,
        address: &str,
        page_size: usize,
        offset: usize,
    ) -> WalletResult<Vec<HistoricalTransaction>> {
        if let Some(reason) = &self.history_error {
            return Err(WalletError::History {
                address: address.to_string(),
                reason: reason.clone(),
            });
        }
        let history = self.history.lock().expect("history lock poisoned");
        Ok(history
            .get(address)
            .map(|entries| entries.iter().skip(offset).take(page_size).cloned().collect())
            .unwrap_or_default())
    }
}

/// A wallet that records its sign calls.
#[derive(Debug)]
pub struct MockWallet {
    currency: String,
    chain: Option<MockChain>,
    sign_error: Option<String>,
    sign_calls: AtomicUsize,
}

impl MockWallet {
    /// A wallet for `currency` that can decode transactions.
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            chain: Some(MockChain::default()),
            sign_error: None,
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// A wallet for `currency` without the decoding capability.
    pub fn without_decoder(currency: &str) -> Self {
        Self {
            chain: None,
            ..Self::new(currency)
        }
    }

    /// Make every `sign` call fail with `reason`.
    pub fn failing_sign(mut self, reason: &str) -> Self {
        self.sign_error = Some(reason.to_string());
        self
    }

    /// Make every `history` call fail with `reason`.
    pub fn failing_history(mut self, reason: &str) -> Self {
        if let Some(chain) = self.chain.as_mut() {
            chain.history_error = Some(reason.to_string());
        }
        self
    }

    /// Record a past transaction of `address`. Newest entries go first.
    pub fn push_history(&self, address: &str, amount: u64, timestamp: u64) {
        if let Some(chain) = &self.chain {
            chain
                .history
                .lock()
                .expect("history lock poisoned")
                .entry(address.to_string())
                .or_default()
                .insert(0, HistoricalTransaction { amount, timestamp });
        }
    }

    /// Number of times `sign` was called.
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Wallet for MockWallet {
    fn currency(&self) -> &str {
        &self.currency
    }

    fn sign(&self, account_ids: &[String], payload: &str) -> WalletResult<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        match &self.sign_error {
            Some(reason) => Err(WalletError::Signing(reason.clone())),
            None => Ok(mock_signature(payload, account_ids)),
        }
    }

    fn decoder(&self) -> Option<&dyn TransactionDecoder> {
        self.chain.as_ref().map(|chain| chain as &dyn TransactionDecoder)
    }
}
