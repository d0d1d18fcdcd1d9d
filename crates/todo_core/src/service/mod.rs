//! Use-case services for the todo store.
//!
//! # Responsibility
//! - Orchestrate repository calls into the ordering engine API.
//! - Keep request layers decoupled from SQL and transactions.

pub mod todo_service;
