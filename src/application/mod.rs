//! Application layer containing the settlement orchestration.
//!
//! This module defines the `SettlementEngine`, the entry point for pricing a
//! task, opening a checkout, applying provider callbacks and moving money in
//! and out of wallets, and the retry policy used against the provider.

pub mod engine;
pub mod retry;
