//! Shared history repository tests.
//!
//! The same test functions run against every backend:
//!
//! - **SQLite**: in-memory databases, run with every `cargo test`
//! - **MySQL / PostgreSQL**: testcontainers, run with `cargo test -- --ignored`
//!
//! Each backend provides a [`harness::HistoryFixture`] that creates the IDO
//! tables and inserts rows in the column types the real schema uses.
