//! Clear the image optimization cache.

use anyhow::Result;

use sitekit_assets::{ImageCache, SiteConfig};

/// Unconditionally empty the cache store.
pub fn run(config: &SiteConfig) -> Result<()> {
    ImageCache::new(&config.cache.dir).clear_all()?;
    tracing::info!("Cleared cache at {}", config.cache.dir.display());
    Ok(())
}
