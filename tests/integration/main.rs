//! Integration tests
//!
//! These tests run the crawler and the full pipeline against wiremock HTTP
//! servers, end-to-end.

mod fetch_tests;
mod pipeline_tests;
