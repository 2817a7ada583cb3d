//! Payment settlement for a tasker services marketplace.
//!
//! A task price is turned into a fee and VAT breakdown, the payer is sent to
//! a provider-hosted checkout page, and the provider's webhook (or a
//! verification poll) settles the payment by crediting the tasker's wallet
//! exactly once. Taskers withdraw from their wallets through the same ledger.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
