// Copyright (c) 2024 Botho Foundation

//! The command message exchanged between cluster nodes.
//!
//! Commands are JSON with camelCase fields:
//!
//! ```json
//! {
//!   "kind": "sign",
//!   "params": {
//!     "currencySymbol": "BTC",
//!     "accountIds": ["acct-1"],
//!     "transactionData": "0100000001..."
//!   }
//! }
//! ```
//!
//! Kinds this node does not understand are kept verbatim, as are any
//! parameters it does not recognize, so such a command can be echoed back
//! unchanged.

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors converting commands to and from their wire form.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum ProtocolError {
    /// Failed to serialize command: {0}
    Serialization(String),

    /// Malformed command: {0}
    Deserialization(String),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

const SIGN: &str = "sign";

/// What a command asks the receiving node to do.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandKind {
    /// Countersign a transaction.
    Sign,

    /// A kind introduced by a newer node.
    Unknown(String),
}

impl From<String> for CommandKind {
    fn from(kind: String) -> Self {
        if kind == SIGN {
            CommandKind::Sign
        } else {
            CommandKind::Unknown(kind)
        }
    }
}

impl From<CommandKind> for String {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Sign => SIGN.to_string(),
            CommandKind::Unknown(kind) => kind,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Sign => f.write_str(SIGN),
            CommandKind::Unknown(kind) => f.write_str(kind),
        }
    }
}

/// Parameters of a signing request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignParams {
    /// Currency of the transaction, e.g. `BTC`.
    #[serde(default)]
    pub currency_symbol: String,

    /// Accounts whose keys authorize the request.
    #[serde(default)]
    pub account_ids: Vec<String>,

    /// Chain-specific encoded transaction. Replaced by the signed encoding
    /// on success.
    #[serde(default)]
    pub transaction_data: String,

    /// Hint identifying user-held key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,

    /// Fields this node does not recognize, kept for echoing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result recorded on a command that was dispatched.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommandOutcome {
    /// `transactionData` now carries this node's signature.
    Signed,

    /// The node refused to sign.
    Rejected {
        /// Human-readable cause.
        reason: String,
    },
}

/// A unit of inter-node work.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCommand {
    /// Requested action.
    pub kind: CommandKind,

    /// Action parameters.
    #[serde(default)]
    pub params: SignParams,

    /// Set by the node that handled the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
}

impl SigningCommand {
    /// A new signing request.
    pub fn sign(
        currency_symbol: impl Into<String>,
        account_ids: Vec<String>,
        transaction_data: impl Into<String>,
    ) -> Self {
        Self {
            kind: CommandKind::Sign,
            params: SignParams {
                currency_symbol: currency_symbol.into(),
                account_ids,
                transaction_data: transaction_data.into(),
                ..Default::default()
            },
            outcome: None,
        }
    }

    /// Attach a user key hint.
    pub fn with_user_key(mut self, user_key: impl Into<String>) -> Self {
        self.params.user_key = Some(user_key.into());
        self
    }

    /// This command marked as refused for `reason`.
    pub fn rejected(mut self, reason: impl Into<String>) -> Self {
        self.outcome = Some(CommandOutcome::Rejected {
            reason: reason.into(),
        });
        self
    }

    /// True if a handler refused this command.
    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, Some(CommandOutcome::Rejected { .. }))
    }

    /// Canonical JSON encoding.
    pub fn to_wire(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Parse the canonical JSON encoding.
    pub fn from_wire(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn command_strategy() -> impl Strategy<Value = SigningCommand> {
        let kind = prop_oneof![
            Just(CommandKind::Sign),
            "[a-zA-Z]{1,12}"
                .prop_filter("not sign", |k| k != SIGN)
                .prop_map(CommandKind::Unknown),
        ];
        let outcome = prop_oneof![
            Just(None),
            Just(Some(CommandOutcome::Signed)),
            ".{0,40}".prop_map(|reason| Some(CommandOutcome::Rejected { reason })),
        ];
        (
            kind,
            "[A-Z]{0,5}",
            proptest::collection::vec("[a-z0-9-]{0,16}", 0..4),
            "[0-9a-f]{0,128}",
            proptest::option::of("[0-9a-f]{0,66}"),
            outcome,
        )
            .prop_map(
                |(kind, currency_symbol, account_ids, transaction_data, user_key, outcome)| {
                    SigningCommand {
                        kind,
                        params: SignParams {
                            currency_symbol,
                            account_ids,
                            transaction_data,
                            user_key,
                            extra: Map::new(),
                        },
                        outcome,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn test_command_wire_roundtrip(command in command_strategy()) {
            let wire = command.to_wire().unwrap();
            prop_assert_eq!(SigningCommand::from_wire(&wire).unwrap(), command);
        }
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let command = SigningCommand::sign("BTC", vec!["acct-1".to_string()], "00ff")
            .with_user_key("02aa");
        let value: Value = serde_json::from_slice(&command.to_wire().unwrap()).unwrap();

        assert_eq!(value["kind"], "sign");
        assert_eq!(value["params"]["currencySymbol"], "BTC");
        assert_eq!(value["params"]["accountIds"][0], "acct-1");
        assert_eq!(value["params"]["transactionData"], "00ff");
        assert_eq!(value["params"]["userKey"], "02aa");
        assert!(value.get("outcome").is_none());
    }

    #[test]
    fn test_unknown_kind_and_fields_survive_roundtrip() {
        let raw = br#"{"kind":"rotateKeys","params":{"currencySymbol":"ETH","epoch":7}}"#;
        let command = SigningCommand::from_wire(raw).unwrap();
        assert_eq!(command.kind, CommandKind::Unknown("rotateKeys".to_string()));
        assert_eq!(command.params.extra["epoch"], 7);

        let echoed: Value = serde_json::from_slice(&command.to_wire().unwrap()).unwrap();
        assert_eq!(echoed["kind"], "rotateKeys");
        assert_eq!(echoed["params"]["epoch"], 7);
    }

    #[test]
    fn test_kind_spelling_is_preserved() {
        for spelling in ["Sign", "SIGN", "sIgn"] {
            let raw = format!(r#"{{"kind":"{spelling}","params":{{}}}}"#);
            let command = SigningCommand::from_wire(raw.as_bytes()).unwrap();
            assert_eq!(command.kind, CommandKind::Unknown(spelling.to_string()));

            let echoed: Value = serde_json::from_slice(&command.to_wire().unwrap()).unwrap();
            assert_eq!(echoed["kind"], spelling);
        }
        assert_eq!(CommandKind::from("sign".to_string()), CommandKind::Sign);
    }

    #[test]
    fn test_rejected_outcome_encoding() {
        let command = SigningCommand::sign("BTC", vec![], "00").rejected("too large");
        assert!(command.is_rejected());
        let value: Value = serde_json::from_slice(&command.to_wire().unwrap()).unwrap();
        assert_eq!(value["outcome"]["status"], "rejected");
        assert_eq!(value["outcome"]["reason"], "too large");
    }

    #[test]
    fn test_malformed_wire_is_an_error() {
        assert!(matches!(
            SigningCommand::from_wire(b"Invalid command format"),
            Err(ProtocolError::Deserialization(_))
        ));
        assert!(matches!(
            SigningCommand::from_wire(br#"{"params":{}}"#),
            Err(ProtocolError::Deserialization(_))
        ));
    }
}
