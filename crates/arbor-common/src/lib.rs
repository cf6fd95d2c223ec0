//! Common utilities for the Arbor XML toolkit.
//!
//! This crate provides shared infrastructure used by all Arbor components:
//! - **Warning System** - colored, deduplicated diagnostics on stderr

pub mod warning;
