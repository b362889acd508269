//! Negocia - sales pipeline board for real-estate negotiations
//!
//! This library provides the core functionality for Negocia, including:
//! - Pipeline stages and negotiation records
//! - An optimistic in-memory store with per-move rollback
//! - A device-independent drag session and read-only stage projections
//! - A directory service trait with a SQLite implementation
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use negocia::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod board;
pub mod cli;
pub mod config;
pub mod db;
pub mod directory;
pub mod models;
pub mod store;
pub mod utils;
