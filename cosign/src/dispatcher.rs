// Copyright (c) 2024 Botho Foundation

//! Turns a received command into a signing action.

use crate::protocol::{CommandKind, CommandOutcome, SigningCommand};
use cosign_common::now_secs;
use cosign_wallet::{RiskGate, Verdict, WalletRegistry};
use tracing::{debug, info, warn};

/// Something that answers commands received over RPC.
pub trait CommandHandler: Send + Sync {
    /// Handle `command` and return the reply.
    fn handle(&self, command: SigningCommand) -> SigningCommand;
}

/// Executes signing commands against the local wallets, behind the risk
/// gate.
#[derive(Debug, Default)]
pub struct Dispatcher {
    wallets: WalletRegistry,
    gate: RiskGate,
}

impl Dispatcher {
    /// Create a dispatcher over `wallets`, enforcing `gate`.
    pub fn new(wallets: WalletRegistry, gate: RiskGate) -> Self {
        Self { wallets, gate }
    }

    /// The registered wallets.
    pub fn wallets(&self) -> &WalletRegistry {
        &self.wallets
    }

    /// Execute `command` using the wall clock for the risk windows.
    pub fn dispatch(&self, command: SigningCommand) -> SigningCommand {
        self.dispatch_at(command, now_secs())
    }

    /// Execute `command` with risk windows measured back from `now`.
    ///
    /// Unknown kinds are returned unchanged. A signing request that cannot
    /// be honored comes back with a [`CommandOutcome::Rejected`] outcome and
    /// its payload untouched.
    pub fn dispatch_at(&self, command: SigningCommand, now: u64) -> SigningCommand {
        match command.kind {
            CommandKind::Sign => self.sign(command, now),
            CommandKind::Unknown(ref kind) => {
                debug!(kind = %kind, "Echoing command of unknown kind");
                command
            }
        }
    }

    fn sign(&self, mut command: SigningCommand, now: u64) -> SigningCommand {
        let currency = command.params.currency_symbol.clone();

        let Some(wallet) = self.wallets.get(&currency) else {
            warn!(currency = %currency, "No wallet for currency");
            return command.rejected(format!("no wallet for currency {currency}"));
        };

        if let Verdict::Reject(reason) =
            self.gate
                .validate_at(wallet.as_ref(), &command.params.transaction_data, now)
        {
            return command.rejected(reason.to_string());
        }

        match wallet.sign(&command.params.account_ids, &command.params.transaction_data) {
            Ok(signed) => {
                info!(
                    currency = %currency,
                    accounts = command.params.account_ids.len(),
                    "Signed transaction"
                );
                command.params.transaction_data = signed;
                command.outcome = Some(CommandOutcome::Signed);
                command
            }
            Err(e) => {
                warn!(currency = %currency, error = %e, "Wallet failed to sign");
                command.rejected(e.to_string())
            }
        }
    }
}

impl CommandHandler for Dispatcher {
    fn handle(&self, command: SigningCommand) -> SigningCommand {
        self.dispatch(command)
    }
}
