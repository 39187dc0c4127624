//! glue-ask - answers natural-language questions over a Glue data catalog.
//!
//! This library exposes the core modules for the binary and for integration tests.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod safety;
pub mod server;
