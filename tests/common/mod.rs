//! Common test utilities for climap.
//!
//! This module provides shared utilities for end-to-end tests: synthetic raw
//! inputs, an HTTP client and image/value assertions.

pub mod assertions;
pub mod http_client;
pub mod image_utils;
pub mod test_data;
