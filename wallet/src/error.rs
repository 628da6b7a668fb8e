// Copyright (c) 2024 Botho Foundation

//! Errors reported by wallet collaborators.

use displaydoc::Display;
use thiserror::Error;

/// Errors a wallet implementation can report.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum WalletError {
    /// Failed to decode transaction: {0}
    Decode(String),

    /// Failed to fetch history for {address}: {reason}
    History {
        /// Address whose history was requested
        address: String,
        /// Backend error text
        reason: String,
    },

    /// Signing failed: {0}
    Signing(String),

    /// Unknown account: {0}
    UnknownAccount(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
