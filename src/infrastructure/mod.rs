//! Adapters behind the domain ports: storage backends and the payment
//! provider's REST API.

pub mod gateway;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
