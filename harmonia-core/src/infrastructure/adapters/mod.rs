// harmonia-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod json_sink;

pub use self::duckdb::DuckDbSourceReader;
pub use json_sink::JsonFileSink;
