// Copyright (c) 2024 Botho Foundation

//! Lookup of the wallet serving each currency.

use crate::traits::Wallet;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Wallets keyed by upper-cased currency symbol.
///
/// Built once at startup and then only read.
#[derive(Clone, Default)]
pub struct WalletRegistry {
    wallets: BTreeMap<String, Arc<dyn Wallet>>,
}

impl WalletRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `wallet` under its own currency symbol, replacing any
    /// previous wallet for that currency.
    pub fn insert(&mut self, wallet: Arc<dyn Wallet>) -> Option<Arc<dyn Wallet>> {
        self.wallets
            .insert(wallet.currency().to_ascii_uppercase(), wallet)
    }

    /// Builder form of [`WalletRegistry::insert`].
    pub fn with(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.insert(wallet);
        self
    }

    /// The wallet for `currency`, ignoring case.
    pub fn get(&self, currency: &str) -> Option<Arc<dyn Wallet>> {
        self.wallets.get(&currency.to_ascii_uppercase()).cloned()
    }

    /// Registered currency symbols, sorted.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.wallets.keys().map(String::as_str)
    }

    /// Number of registered wallets.
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    /// True if no wallet is registered.
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.currencies()).finish()
    }
}
