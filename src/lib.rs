//! Record mapping for relational databases.
//!
//! A [`Schema`] declares the typed, validated fields of a table, a [`Record`] holds one row of it
//! and a [`Query`] selects many. Statements are printed by the [`Dialect`] of the [`Driver`] the
//! record was created with, so the same code runs on every backend.
pub use tether_core::*;
