//! Core leave administration logic for Furlough.
//!
//! This crate contains pure business logic with ZERO web or storage dependencies.
//! All domain types, policy rules, balance accounting and the request state
//! machine live here.
//!
//! # Modules
//!
//! - `employee` - Employee facts read from the directory
//! - `policy` - Versioned leave types, eligibility and day counting
//! - `ledger` - Per-employee balance ledger
//! - `conflict` - Team coverage conflict detection
//! - `workflow` - Leave request lifecycle and approval chain

pub mod conflict;
pub mod employee;
pub mod ledger;
pub mod policy;
pub mod workflow;
