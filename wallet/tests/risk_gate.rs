// Copyright (c) 2024 Botho Foundation

//! Risk gate scenarios against the mock wallet.

use cosign_wallet::{RejectReason, RiskGate, RiskLimits, RiskPolicy, Verdict, WalletRegistry};
use cosign_wallet_test_utils::{mock_transaction, MockWallet};
use std::sync::Arc;

const NOW: u64 = 1_700_000_000;

fn gate(currency: &str, limits: RiskLimits) -> RiskGate {
    RiskGate::new(RiskPolicy::new().with(currency, limits))
}

#[test]
fn test_accept_under_per_transaction_limit() {
    let wallet = MockWallet::new("BTC");
    let verdict = gate("BTC", RiskLimits::new(100, 0, 0)).validate_at(
        &wallet,
        &mock_transaction(50, &["addr1"], NOW),
        NOW,
    );
    assert_eq!(verdict, Verdict::Accept);
}

#[test]
fn test_reject_over_per_transaction_limit() {
    let wallet = MockWallet::new("BTC");
    let verdict = gate("BTC", RiskLimits::new(100, 0, 0)).validate_at(
        &wallet,
        &mock_transaction(150, &["addr1"], NOW),
        NOW,
    );
    assert_eq!(
        verdict,
        Verdict::Reject(RejectReason::PerTransaction {
            amount: 150,
            limit: 100
        })
    );
    assert_eq!(wallet.sign_calls(), 0);
}

#[test]
fn test_reject_over_hourly_limit() {
    let wallet = MockWallet::new("BTC");
    wallet.push_history("addr1", 50, NOW - 1_200);
    wallet.push_history("addr1", 30, NOW - 60);

    let verdict = gate("BTC", RiskLimits::new(0, 100, 0)).validate_at(
        &wallet,
        &mock_transaction(30, &["addr1"], NOW),
        NOW,
    );
    assert_eq!(
        verdict,
        Verdict::Reject(RejectReason::Hourly {
            total: 110,
            limit: 100
        })
    );
}

#[test]
fn test_history_summed_across_senders() {
    let wallet = MockWallet::new("ETH");
    wallet.push_history("a", 300, NOW - 10_000);
    wallet.push_history("b", 300, NOW - 20_000);

    let gate = gate("ETH", RiskLimits::new(0, 0, 700));
    assert!(gate
        .validate_at(&wallet, &mock_transaction(100, &["a", "b"], NOW), NOW)
        .is_accept());
    assert!(!gate
        .validate_at(&wallet, &mock_transaction(101, &["a", "b"], NOW), NOW)
        .is_accept());
}

#[test]
fn test_windows_measured_from_now_not_tx_timestamp() {
    let wallet = MockWallet::new("BTC");
    wallet.push_history("addr1", 90, NOW - 100);

    // The transaction claims to be two hours old; the recent spend still
    // counts because windows are measured from the validation time.
    let stale_tx = mock_transaction(20, &["addr1"], NOW - 7_200);
    assert!(!gate("BTC", RiskLimits::new(0, 100, 0))
        .validate_at(&wallet, &stale_tx, NOW)
        .is_accept());
}

#[test]
fn test_unconfigured_currency_and_missing_decoder_fail_open() {
    let gated = gate("BTC", RiskLimits::new(1, 1, 1));

    let other = MockWallet::new("ETH");
    assert!(gated
        .validate_at(&other, &mock_transaction(1_000, &["x"], NOW), NOW)
        .is_accept());

    let opaque = MockWallet::without_decoder("BTC");
    assert!(gated.validate_at(&opaque, "not even json", NOW).is_accept());
}

#[test]
fn test_history_error_fails_closed() {
    let wallet = MockWallet::new("BTC").failing_history("explorer unreachable");
    let verdict = gate("BTC", RiskLimits::new(0, 0, 100)).validate_at(
        &wallet,
        &mock_transaction(1, &["addr1"], NOW),
        NOW,
    );
    assert!(matches!(
        verdict,
        Verdict::Reject(RejectReason::HistoryUnavailable(reason)) if reason.contains("explorer unreachable")
    ));
}

#[test]
fn test_wallet_registry_lookup_ignores_case() {
    let registry = WalletRegistry::new()
        .with(Arc::new(MockWallet::new("btc")))
        .with(Arc::new(MockWallet::new("ETH")));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("BTC").unwrap().currency(), "btc");
    assert!(registry.get("eth").is_some());
    assert!(registry.get("LTC").is_none());
    assert_eq!(registry.currencies().collect::<Vec<_>>(), vec!["BTC", "ETH"]);
}
