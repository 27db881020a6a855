//! BRENDA Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared row models and utilities for the BRENDA mirror workspace.
//!
//! # Overview
//!
//! - **Types**: row models for the four mirror tables (`enzymes`, `proteins`,
//!   `enzyme_facts`, `text_facts`) and the per-enzyme count accumulator
//! - **Field codes**: the legacy flat-file field code table
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```
//! use brenda_common::field_codes::field_name;
//! use brenda_common::types::is_ec_number;
//!
//! assert_eq!(field_name("KM"), Some("Km value"));
//! assert!(is_ec_number("1.1.1.1"));
//! ```

pub mod field_codes;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{EnzymeCounts, EnzymeFactRow, EnzymeRow, MirrorTable, ProteinRow, TextFactRow};
