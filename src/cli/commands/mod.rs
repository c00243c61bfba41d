//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod decode;
pub mod persist;
pub mod serve;
pub mod validate;
