// Copyright (c) 2024 Botho Foundation

//! The pre-signing risk gate.
//!
//! Bounds exposure per transaction and over the trailing hour and day. The
//! gate is opt-in per currency: a wallet without a [`TransactionDecoder`] or
//! a currency without [`RiskLimits`] is always accepted. Once limits are
//! configured, a transaction that cannot be decoded or checked is rejected.

use crate::{
    limits::{RiskLimits, RiskPolicy},
    traits::{HistoricalTransaction, TransactionDecoder, Wallet},
};
use cosign_common::now_secs;
use displaydoc::Display;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Number of history entries fetched per sender address.
pub const HISTORY_PAGE_SIZE: usize = 100;

/// Length of the hourly window in seconds.
pub const HOUR_SECS: u64 = 3_600;

/// Length of the daily window in seconds.
pub const DAY_SECS: u64 = 86_400;

/// Why the gate refused a transaction.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum RejectReason {
    /// Amount {amount} exceeds the per-transaction limit {limit}
    PerTransaction {
        /// Amount of the new transaction
        amount: u64,
        /// Configured limit
        limit: u64,
    },

    /// Hourly total {total} would exceed the limit {limit}
    Hourly {
        /// Trailing-hour sum plus the new amount
        total: u64,
        /// Configured limit
        limit: u64,
    },

    /// Daily total {total} would exceed the limit {limit}
    Daily {
        /// Trailing-day sum plus the new amount
        total: u64,
        /// Configured limit
        limit: u64,
    },

    /// Transaction could not be decoded: {0}
    Undecodable(String),

    /// Sender history unavailable: {0}
    HistoryUnavailable(String),
}

/// Result of running the gate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Signing may proceed.
    Accept,
    /// Signing must not be invoked.
    Reject(RejectReason),
}

impl Verdict {
    /// True for [`Verdict::Accept`].
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Totals already spent by the sender addresses inside each window.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WindowTotals {
    /// Sum over the trailing hour.
    pub hourly: u64,
    /// Sum over the trailing day.
    pub daily: u64,
}

impl WindowTotals {
    /// Sum the entries that fall strictly after `now - window`.
    pub fn from_history<'a>(
        history: impl IntoIterator<Item = &'a HistoricalTransaction>,
        now: u64,
    ) -> Self {
        let hour_cutoff = now.saturating_sub(HOUR_SECS);
        let day_cutoff = now.saturating_sub(DAY_SECS);

        history
            .into_iter()
            .fold(Self::default(), |mut totals, tx| {
                if tx.timestamp > hour_cutoff {
                    totals.hourly = totals.hourly.saturating_add(tx.amount);
                }
                if tx.timestamp > day_cutoff {
                    totals.daily = totals.daily.saturating_add(tx.amount);
                }
                totals
            })
    }

    fn add(self, other: Self) -> Self {
        Self {
            hourly: self.hourly.saturating_add(other.hourly),
            daily: self.daily.saturating_add(other.daily),
        }
    }
}

/// Checks signing requests against a [`RiskPolicy`].
#[derive(Clone, Debug, Default)]
pub struct RiskGate {
    policy: RiskPolicy,
}

impl RiskGate {
    /// Create a gate enforcing `policy`.
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    /// The enforced policy.
    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Check `payload` for `wallet`'s currency against the wall clock.
    pub fn validate(&self, wallet: &dyn Wallet, payload: &str) -> Verdict {
        self.validate_at(wallet, payload, now_secs())
    }

    /// Check `payload` with windows measured back from `now`.
    pub fn validate_at(&self, wallet: &dyn Wallet, payload: &str, now: u64) -> Verdict {
        let currency = wallet.currency();
        let (Some(decoder), Some(limits)) = (wallet.decoder(), self.policy.get(currency)) else {
            debug!(currency, "Risk gate not configured, accepting");
            return Verdict::Accept;
        };

        let verdict = check(decoder, limits, payload, now);
        match &verdict {
            Verdict::Accept => debug!(currency, "Risk gate accepted transaction"),
            Verdict::Reject(reason) => warn!(currency, %reason, "Risk gate rejected transaction"),
        }
        verdict
    }
}

fn check(decoder: &dyn TransactionDecoder, limits: &RiskLimits, payload: &str, now: u64) -> Verdict {
    let tx = match decoder.decode_transaction(payload) {
        Ok(tx) => tx,
        Err(e) => return Verdict::Reject(RejectReason::Undecodable(e.to_string())),
    };

    if limits.max_per_transaction != 0 && tx.amount > limits.max_per_transaction {
        return Verdict::Reject(RejectReason::PerTransaction {
            amount: tx.amount,
            limit: limits.max_per_transaction,
        });
    }

    if !limits.needs_history() {
        return Verdict::Accept;
    }

    // An address listed twice is only counted once.
    let senders: BTreeSet<&str> = tx.from_addresses.iter().map(String::as_str).collect();
    let mut totals = WindowTotals::default();
    for address in senders {
        match decoder.history(address, HISTORY_PAGE_SIZE, 0) {
            Ok(history) => totals = totals.add(WindowTotals::from_history(&history, now)),
            Err(e) => return Verdict::Reject(RejectReason::HistoryUnavailable(e.to_string())),
        }
    }

    let hourly = totals.hourly.saturating_add(tx.amount);
    if limits.max_per_hour != 0 && hourly > limits.max_per_hour {
        return Verdict::Reject(RejectReason::Hourly {
            total: hourly,
            limit: limits.max_per_hour,
        });
    }

    let daily = totals.daily.saturating_add(tx.amount);
    if limits.max_per_day != 0 && daily > limits.max_per_day {
        return Verdict::Reject(RejectReason::Daily {
            total: daily,
            limit: limits.max_per_day,
        });
    }

    Verdict::Accept
}
