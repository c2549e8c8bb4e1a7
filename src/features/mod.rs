//! Derived statistics
//!
//! Shooting-goal arithmetic over raw free-throw counts.

pub mod free_throws;
