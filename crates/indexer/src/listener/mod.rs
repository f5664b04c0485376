//! Block ingestion.
//!
//! - [`NodeApi`] / [`NodeClient`]: block and height fetches from the node
//! - [`BlockScanner`]: the resumable scan loop

pub mod provider;
pub mod scanner;

pub use provider::{NodeApi, NodeClient};
pub use scanner::{BlockScanner, ScanState, ScanStatus};
