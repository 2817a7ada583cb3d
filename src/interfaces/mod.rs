//! Outer surfaces: the HTTP API and CSV batch input/output.

pub mod csv;
pub mod http;
