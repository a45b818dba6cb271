//! CLI command implementations.

pub mod build;
pub mod clearcache;
pub mod dev;
pub mod sprite;
