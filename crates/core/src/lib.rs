//! # LTO Index Core
//!
//! Chain data model, transaction type table and encoding helpers shared by the
//! LTO indexer.
//!
//! ## Features
//!
//! - **Chain Types**: Block, Transaction, Transfer, DataEntry as served by the node
//! - **Constants**: Transaction type tags, type names and anchor markers
//! - **Encoding**: hex / base64 / base58 helpers used to normalise anchor hashes

#![warn(missing_docs)]

pub mod constants;
pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use error::{CoreError, Result};
pub use types::*;
