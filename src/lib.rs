//! # StrataKV
//!
//! An embeddable, persistent, ordered key-value storage engine built on the
//! log-structured-merge (LSM) pattern:
//! - Writes land in a sorted in-memory table
//! - Tables over a byte threshold are sealed into immutable on-disk segments
//! - Reads merge the live table with every segment, newest version wins
//! - Deleted keys are hidden by tombstones until compaction
//!
//! ## Architecture Overview
//!
//! ```text
//!              put / delete                    scan / get
//!                   │                               │
//!                   ▼                               ▼
//!            ┌─────────────┐              ┌──────────────────┐
//!            │  MemTable   │─────────────▶│   k-way merge    │
//!            │  (BTreeMap) │              │ collapse by key  │
//!            └──────┬──────┘              │ drop tombstones  │
//!                   │ size > threshold    └──────────────────┘
//!                   ▼                               ▲
//!            ┌─────────────┐                        │
//!            │  Segments   │────────────────────────┘
//!            │ (mmap .dat) │◀── compact() rewrites the set
//!            └─────────────┘
//! ```
//!
//! The engine is single-threaded and synchronous: flushes happen inline with
//! the write that crosses the threshold, and compaction runs only when asked.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod row;
pub mod table;
pub mod memtable;
pub mod segment;
pub mod iterator;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StrataError};
pub use config::Config;
pub use engine::Engine;
pub use row::{Row, Value};
pub use table::Table;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
