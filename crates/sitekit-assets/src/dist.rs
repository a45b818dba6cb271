//! Dist assembler: copy already-produced artifacts into the distribution.
//!
//! Runs after the style/script/markup transforms; it never produces
//! artifacts of its own, only places them.

use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::util::{copy_into, copy_tree};

/// Errors that can occur while assembling the distribution.
#[derive(Debug, thiserror::Error)]
pub enum DistError {
    #[error("Missing build artifact {path}: run its producing step first")]
    MissingArtifact { path: PathBuf },

    #[error("Failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn place(artifact: &Path, dest_dir: &Path) -> Result<(), DistError> {
    if !artifact.is_file() {
        return Err(DistError::MissingArtifact {
            path: artifact.to_path_buf(),
        });
    }
    copy_into(artifact, dest_dir).map_err(|source| DistError::Copy {
        path: artifact.to_path_buf(),
        source,
    })
}

/// Assemble the distribution tree: fonts, compiled stylesheet, bundled
/// script and the server-config file.
pub fn run(config: &SiteConfig) -> Result<(), DistError> {
    // Server-config file is optional; projects without one just skip it
    let htaccess = Path::new(".htaccess");
    if htaccess.is_file() {
        copy_into(htaccess, &config.build.home).map_err(|source| DistError::Copy {
            path: htaccess.to_path_buf(),
            source,
        })?;
    } else {
        tracing::debug!("No .htaccess to place");
    }

    let fonts = copy_tree(&config.src.fonts, &config.build.home.join("fonts")).map_err(
        |source| DistError::Copy {
            path: config.src.fonts.clone(),
            source,
        },
    )?;
    tracing::debug!("Placed {} font files", fonts);

    place(&config.style_output(), &config.build.css)?;
    place(&config.script_output(), &config.build.js)?;

    tracing::info!("Assembled distribution at {}", config.build.home.display());
    Ok(())
}

/// Place the assembled sprite into the image output tree.
///
/// A missing sprite is not an error: the sprite is generated by a separate
/// entry point and many projects never use one.
pub fn place_sprite(config: &SiteConfig) -> Result<(), DistError> {
    let sprite = config.sprite_output();
    if !sprite.is_file() {
        tracing::warn!("No sprite at {}, skipping placement", sprite.display());
        return Ok(());
    }
    copy_into(&sprite, &config.build.img).map_err(|source| DistError::Copy {
        path: sprite,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.src.css = dir.join("src/css");
        config.src.js = dir.join("src/js");
        config.src.fonts = dir.join("src/fonts");
        config.src.img = dir.join("src/img");
        config.build.home = dir.join("dist");
        config.build.css = dir.join("dist/css");
        config.build.js = dir.join("dist/js");
        config.build.img = dir.join("dist/img");
        config
    }

    #[test]
    fn places_artifacts_and_fonts() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        fs::create_dir_all(&config.src.css).unwrap();
        fs::create_dir_all(&config.src.js).unwrap();
        fs::create_dir_all(&config.src.fonts).unwrap();
        fs::write(config.style_output(), "body{}").unwrap();
        fs::write(config.script_output(), "console.log(1)").unwrap();
        fs::write(config.src.fonts.join("site.woff2"), "font").unwrap();

        run(&config).unwrap();

        assert!(config.build.css.join("main.min.css").exists());
        assert!(config.build.js.join("scripts.min.js").exists());
        assert!(config.build.home.join("fonts/site.woff2").exists());
    }

    #[test]
    fn missing_stylesheet_artifact_fails() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let result = run(&config);
        assert!(matches!(result, Err(DistError::MissingArtifact { .. })));
    }

    #[test]
    fn sprite_placement_is_optional() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        place_sprite(&config).unwrap();
        assert!(!config.build.img.join("sprite.svg").exists());

        fs::create_dir_all(&config.src.img).unwrap();
        fs::write(config.sprite_output(), "<svg/>").unwrap();

        place_sprite(&config).unwrap();
        assert!(config.build.img.join("sprite.svg").exists());
    }
}
