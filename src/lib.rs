//! Schedula client: sends two course-scheduling input files to a remote
//! solver, turns the returned room/time/course assignments into a
//! room × time grid and exports it.
//!
//! ```text
//! lib.rs
//! ├── schedule/   – assignment records and the grid builder
//! ├── export      – CSV export and the two input templates
//! ├── session     – selected files, busy flag, current schedule
//! ├── client      – multipart POST to the solver
//! ├── display     – plain-text grid rendering
//! ├── web         – actix-web front end
//! ├── config      – YAML / env configuration
//! └── error       – error types
//! ```

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod schedule;
pub mod session;
pub mod web;
