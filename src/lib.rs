//! # Ranking Engine
//!
//! Tournament points, standings and weekly ranking snapshots.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (seasons, tournaments, matches, snapshots)
//! - **storage**: Filesystem JSONL store
//! - **calculate**: Round parsing, tournament scoring and standings
//! - **snapshot**: Official Monday math, preview/confirm and retention
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod snapshot;
pub mod storage;

pub use models::*;
