//! Repository layer for the todo store.
//!
//! # Responsibility
//! - Define the data access contract the ordering engine runs against.
//! - Keep SQL and transaction boundaries out of the service layer.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `NotInTrash`) in
//!   addition to DB transport errors.

pub mod todo_repo;
