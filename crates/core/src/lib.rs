//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and balance calculations live here.
//!
//! # Modules
//!
//! - `posting` - Transaction and deposit posting, reversal and settlement
//! - `clock` - Time source for installment due dates

pub mod clock;
pub mod posting;
