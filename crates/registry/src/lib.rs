//! Core of the rugwatch registry: domain types, the SQLite-backed report
//! store, and the deterministic risk evaluator. No HTTP concerns here; the
//! `api` crate owns the transport.

pub mod db;
pub mod error;
pub mod risk;
pub mod store;
pub mod types;
