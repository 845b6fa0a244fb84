//! Adaptive cleanup of Icinga IDO history tables.
//!
//! The daemon deletes rows older than a per-table retention age from the IDO
//! history tables, in bounded batches, and speeds up while a backlog remains.
//!
//! - [`registry`]: the known history tables and their time columns
//! - [`db`]: per-backend implementations of the table operations
//! - [`retention`]: cleanup rounds and the adaptive scheduler
//! - [`startup`]: connecting and resolving the IDO instance

pub mod config;
pub mod db;
pub mod observability;
pub mod registry;
pub mod retention;
pub mod shutdown;
pub mod startup;
