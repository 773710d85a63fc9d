//! Request and result types of a composition.

/// Composition inputs and parameter enums.
pub mod request;
/// Composition output artifact.
pub mod result;
