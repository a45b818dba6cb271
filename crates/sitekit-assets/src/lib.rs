//! Asset transforms and build workflow for sitekit.
//!
//! Each transform is a pure pipeline: read source(s), apply an ordered set of
//! filters, write one artifact. The build workflow composes them in a strict
//! sequence; the dev workflow re-runs individual transforms on file changes.

pub mod build;
pub mod cache;
pub mod config;
pub mod dist;
pub mod images;
pub mod markup;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod util;

pub use build::{BuildError, BuildReport, BuildRunner};
pub use cache::{ContentHash, ImageCache};
pub use config::{ConfigError, SiteConfig};
pub use sprite::SpriteMode;
