// Copyright (c) 2024 Botho Foundation

//! Wallet collaborator boundary and the pre-signing risk gate.
//!
//! Per-currency wallet code lives outside this workspace. It plugs in by
//! implementing [`Wallet`], and optionally [`TransactionDecoder`] to opt its
//! currency into risk checking. The [`RiskGate`] runs before any signature is
//! produced.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod limits;
pub mod registry;
pub mod traits;
pub mod validator;

pub use error::{WalletError, WalletResult};
pub use limits::{RiskLimits, RiskPolicy};
pub use registry::WalletRegistry;
pub use traits::{DecodedTransaction, HistoricalTransaction, TransactionDecoder, Wallet};
pub use validator::{
    RejectReason, RiskGate, Verdict, WindowTotals, DAY_SECS, HISTORY_PAGE_SIZE, HOUR_SECS,
};
