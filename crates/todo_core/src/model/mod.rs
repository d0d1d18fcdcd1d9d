//! Todo domain model and pure ordering rules.
//!
//! # Invariants
//! - Every todo is identified by a stable `TodoId` independent of its rank.
//! - Deletion is a `deleted_at` tombstone until a permanent delete.

pub mod ordering;
pub mod todo;
