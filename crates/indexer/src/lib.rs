//! Block indexer for the LTO public chain.
//!
//! This crate provides:
//! - A resumable block scanner driven by the node REST API
//! - Transaction dispatch into derived indexes (history, anchors, identities,
//!   associations, trust network roles, daily statistics)
//! - A storage abstraction with in-memory and SQLite backends
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │  lto-indexer                     │
//! │                                  │
//! │  ┌─────────────────┐             │
//! │  │  Block Scanner  │ ← node REST │
//! │  │  (tokio task)   │   /blocks   │
//! │  └────────┬────────┘             │
//! │           │ tx, in block order   │
//! │      ┌────▼─────────┐            │
//! │      │ IndexService │            │
//! │      │ (dispatcher) │            │
//! │      └────┬─────────┘            │
//! │           │                      │
//! │      ┌────▼──────┐               │
//! │      │  Storage  │ ← memory or   │
//! │      │  (trait)  │   SQLite      │
//! │      └───────────┘               │
//! │           ▲                      │
//! │           │ checkpoint after     │
//! │           │ each block           │
//! └──────────────────────────────────┘
//! ```
//!
//! Indexing is at-least-once: a block is re-processed if the process stops
//! before its checkpoint is written. Every index is merge-safe except the
//! daily statistics, which count a replayed block again.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod index;
pub mod listener;
pub mod storage;

pub use error::{IndexerError, Result};

// Re-export common types
pub use lto_index_core::{types::*, *};
