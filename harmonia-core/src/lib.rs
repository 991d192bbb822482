// harmonia-core/src/lib.rs

// 1. Documentation is not enforced yet
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Source readers and audit sinks.
pub mod ports;

// 2. Domain (business core)
// Dataset model, harmonization, fairness.
// Depends on nothing else in the crate (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// Config files, DuckDB reader, JSON sink.
pub mod infrastructure;

// 4. Application (Use Cases)
// Pipeline orchestration, run summary, clean.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use harmonia_core::HarmoniaError;
pub use error::HarmoniaError;
