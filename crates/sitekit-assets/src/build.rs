//! Build workflow: the strict clean-through-sprite sequence.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use crate::cache::ImageCache;
use crate::config::SiteConfig;
use crate::dist::{self, DistError};
use crate::images::{self, ImageError};
use crate::markup::{self, MarkupError};
use crate::scripts::{self, ScriptError};
use crate::styles::{self, StyleError};

/// Errors that can abort the build workflow. The first failing step wins;
/// later steps never run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to clean {path}: {source}")]
    Clean { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Dist(#[from] DistError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildReport {
    /// Number of images published
    pub images: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Distribution root
    pub output_dir: PathBuf,
}

/// Runs the build workflow in strict sequence.
pub struct BuildRunner<'a> {
    config: &'a SiteConfig,
    cache: ImageCache,
}

impl<'a> BuildRunner<'a> {
    /// Create a runner for a loaded configuration.
    pub fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            cache: ImageCache::new(&config.cache.dir),
        }
    }

    /// Empty the distribution root. Tolerates its absence.
    fn clean(&self) -> Result<(), BuildError> {
        let dist = &self.config.build.home;
        match fs::remove_dir_all(dist) {
            Ok(()) => {
                tracing::info!("Cleaned {}", dist.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BuildError::Clean {
                path: dist.clone(),
                source,
            }),
        }
    }

    /// Run the full sequence: clean, style, script, markup, dist assembly,
    /// images, sprite placement. Each step's writes are durable (atomic
    /// rename) before the next starts.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();

        self.clean()?;
        styles::run(self.config)?;
        scripts::run(self.config)?;
        markup::run(self.config)?;
        dist::run(self.config)?;
        let images = images::run(self.config, &self.cache)?;
        dist::place_sprite(self.config)?;

        Ok(BuildReport {
            images,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.build.home.clone(),
        })
    }
}
