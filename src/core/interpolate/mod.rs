//! Template interpolation
//!
//! Expands `${...}` placeholders in persistence descriptors (paths, URIs,
//! mail subjects) using supplied values and a small set of built-in
//! functions.

pub mod engine;
pub mod functions;

pub use engine::InterpolateEngine;
pub use functions::ExpressionError;
