//! Sprite assembly commands (spritesvg / storesvg).

use anyhow::Result;

use sitekit_assets::{sprite, SiteConfig, SpriteMode};

/// Assemble the sprite in the requested mode and exit.
pub fn run(config: &SiteConfig, mode: SpriteMode) -> Result<()> {
    let output = sprite::run(config, mode)?;
    tracing::info!("Sprite written to {}", output.display());

    if mode == SpriteMode::Store && !config.scripts.svg_polyfill {
        tracing::warn!(
            "Store-mode sprites need the svg4everybody polyfill; \
             set [scripts] svg_polyfill = true and rebuild the scripts"
        );
    }

    Ok(())
}
