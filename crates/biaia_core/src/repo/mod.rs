//! Repository layer: source-data access, change feed and durable key-value
//! storage.
//!
//! # Invariants
//! - Writes validate records before SQL mutations.
//! - Change events are published only after the write committed.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod change_feed;
pub mod kv_store;
pub mod source_repo;
