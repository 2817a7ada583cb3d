//! Domain model for task payments: money, fees, payments, wallets and the
//! ledger that ties them together, plus the ports the application layer
//! depends on.

pub mod fees;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
pub mod wallet;
pub mod webhook;
pub mod withdrawal;
