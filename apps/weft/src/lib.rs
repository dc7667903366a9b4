//! # Weft Application Library
//!
//! Library surface of THE BINARY, exposed so integration tests can drive
//! the HTTP router and CLI commands in-process without spawning a server.
//!
//! The binary target (`main.rs`) compiles the same modules directly.

pub mod api;
pub mod cli;
