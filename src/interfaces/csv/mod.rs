pub mod quote_reader;
pub mod writer;
