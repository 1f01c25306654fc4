//! Expense submission and approval workflow engine.
//!
//! Employees submit expenses, managers approve or reject them, and
//! approved (or auto-approved) expenses are settled against an external
//! payment processor through a durable settlement channel. Every status
//! transition lands in an append-only audit trail.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
