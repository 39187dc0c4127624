//! Integration tests for glue-ask.

pub mod common;
pub mod handler_test;
pub mod pipeline_test;
pub mod postgres_test;
pub mod server_test;
