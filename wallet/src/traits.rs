// Copyright (c) 2024 Botho Foundation

//! The boundary between the co-signing core and per-currency wallet code.

use crate::error::WalletResult;
use serde::{Deserialize, Serialize};

/// What the risk gate needs to know about a transaction before signing it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DecodedTransaction {
    /// Value moved, in the currency's smallest unit.
    pub amount: u64,

    /// Addresses whose funds are spent.
    pub from_addresses: Vec<String>,

    /// Unix seconds, when the encoding carries one.
    pub timestamp: u64,
}

/// One past transaction of an address.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTransaction {
    /// Value moved, in the currency's smallest unit.
    pub amount: u64,

    /// Unix seconds.
    pub timestamp: u64,
}

/// Optional wallet capability: understanding raw transactions and looking up
/// address history.
///
/// Currencies whose wallet does not provide this are not risk-checked.
pub trait TransactionDecoder: Send + Sync {
    /// Decode a chain-specific transaction payload.
    fn decode_transaction(&self, payload: &str) -> WalletResult<DecodedTransaction>;

    /// Most recent transactions of `address`, newest first.
    fn history(
        &self,
        address: &str,
        page_size: usize,
        offset: usize,
    ) -> WalletResult<Vec<HistoricalTransaction>>;
}

/// A per-currency wallet holding this node's share of signing authority.
pub trait Wallet: Send + Sync {
    /// Currency symbol this wallet serves, e.g. `BTC`.
    fn currency(&self) -> &str;

    /// Add this node's signature to `payload` using the keys of
    /// `account_ids`, returning the updated payload.
    fn sign(&self, account_ids: &[String], payload: &str) -> WalletResult<String>;

    /// The decoding capability, if this wallet has one.
    fn decoder(&self) -> Option<&dyn TransactionDecoder> {
        None
    }
}
