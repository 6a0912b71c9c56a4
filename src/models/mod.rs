//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Registered application (identity) model
pub mod app;
