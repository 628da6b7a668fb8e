// Copyright (c) 2024 Botho Foundation

//! Per-currency risk limits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Spending limits for one currency, in its smallest unit.
///
/// A limit of zero disables that dimension.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Largest single transaction.
    pub max_per_transaction: u64,

    /// Largest total over the trailing hour, including the new transaction.
    pub max_per_hour: u64,

    /// Largest total over the trailing day, including the new transaction.
    pub max_per_day: u64,
}

impl RiskLimits {
    /// Limits with every dimension set.
    pub fn new(max_per_transaction: u64, max_per_hour: u64, max_per_day: u64) -> Self {
        Self {
            max_per_transaction,
            max_per_hour,
            max_per_day,
        }
    }

    /// True if no dimension is limited.
    pub fn is_unlimited(&self) -> bool {
        self.max_per_transaction == 0 && self.max_per_hour == 0 && self.max_per_day == 0
    }

    /// True if either windowed limit is set, so history must be fetched.
    pub fn needs_history(&self) -> bool {
        self.max_per_hour != 0 || self.max_per_day != 0
    }
}

/// Risk limits keyed by upper-cased currency symbol.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskPolicy {
    limits: HashMap<String, RiskLimits>,
}

impl RiskPolicy {
    /// An empty policy: every currency is unchecked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits for `currency`.
    pub fn set(&mut self, currency: &str, limits: RiskLimits) {
        self.limits.insert(currency.to_ascii_uppercase(), limits);
    }

    /// Builder form of [`RiskPolicy::set`].
    pub fn with(mut self, currency: &str, limits: RiskLimits) -> Self {
        self.set(currency, limits);
        self
    }

    /// The limits configured for `currency`, if any.
    pub fn get(&self, currency: &str) -> Option<&RiskLimits> {
        self.limits.get(currency).or_else(|| {
            self.limits
                .iter()
                .find(|(symbol, _)| symbol.eq_ignore_ascii_case(currency))
                .map(|(_, limits)| limits)
        })
    }

    /// Number of configured currencies.
    pub fn len(&self) -> usize {
        self.limits.len()
    }

    /// True if no currency has limits.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
