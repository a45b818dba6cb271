//! Image transform: optimize the `images/` and `favicon/` trees.
//!
//! Everything else under the image root is excluded, notably the `svg/` icon
//! sources consumed by the sprite assembler. Optimization runs through the
//! content-hash cache so unchanged images are not reprocessed.

use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use image::ImageFormat;
use walkdir::WalkDir;

use crate::cache::{CacheError, ContentHash, ImageCache};
use crate::config::SiteConfig;
use crate::util::write_atomic;

/// Subdirectories of the image root that are published.
const PUBLISHED_DIRS: [&str; 2] = ["images", "favicon"];

/// Errors that can occur in the image transform.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to optimize {path}: {message}")]
    Optimize { path: PathBuf, message: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Whether a path relative to the image root belongs to a published tree.
fn is_published(rel: &Path) -> bool {
    match rel.components().next() {
        Some(Component::Normal(first)) => PUBLISHED_DIRS
            .iter()
            .any(|dir| first.eq_ignore_ascii_case(dir)),
        _ => false,
    }
}

/// Re-encode png and jpeg; pass anything else through unchanged.
///
/// If the re-encoded file is larger than the source, the source wins.
fn optimize(path: &Path, bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let format = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => ImageFormat::Png,
        Some("jpg" | "jpeg") => ImageFormat::Jpeg,
        // Gifs are never re-encoded: a decode keeps only the first frame,
        // which would flatten animations
        _ => return Ok(bytes.to_vec()),
    };

    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|e| ImageError::Optimize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut encoded = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut encoded), format)
        .map_err(|e| ImageError::Optimize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Run the image transform, mirroring the filtered structure under the build
/// image path. Returns the number of files published.
pub fn run(config: &SiteConfig, cache: &ImageCache) -> Result<usize, ImageError> {
    let root = &config.src.img;
    if !root.is_dir() {
        tracing::warn!("Image root {} does not exist, skipping", root.display());
        return Ok(0);
    }

    let mut published = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir yields paths under its root");
        if !is_published(rel) {
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| ImageError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;

        let hash = ContentHash::of_bytes(&bytes);
        let optimized = match cache.get(hash) {
            Some(hit) => {
                tracing::debug!("Cache hit {} for {}", hash, rel.display());
                hit
            }
            None => {
                let optimized = optimize(entry.path(), &bytes)?;
                cache.put(hash, &optimized)?;
                optimized
            }
        };

        let dest = config.build.img.join(rel);
        write_atomic(&dest, &optimized).map_err(|source| ImageError::Write {
            path: dest.clone(),
            source,
        })?;
        published += 1;
    }

    tracing::info!(
        "Published {} images -> {}",
        published,
        config.build.img.display()
    );
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.src.img = dir.join("img");
        config.build.img = dir.join("dist/img");
        config
    }

    fn cache_at(dir: &Path) -> ImageCache {
        ImageCache::new(&dir.join("cache"))
    }

    #[test]
    fn filters_published_trees() {
        assert!(is_published(Path::new("images/photo.jpg")));
        assert!(is_published(Path::new("favicon/icon.png")));
        assert!(!is_published(Path::new("svg/marker.svg")));
        assert!(!is_published(Path::new("raw/photo.jpg")));
    }

    #[test]
    fn never_publishes_icon_sources() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        fs::create_dir_all(config.src.img.join("svg")).unwrap();
        fs::create_dir_all(config.src.img.join("images")).unwrap();
        fs::write(config.src.img.join("svg/marker.svg"), "<svg/>").unwrap();
        fs::write(config.src.img.join("images/logo.svg"), "<svg/>").unwrap();

        let published = run(&config, &cache_at(dir.path())).unwrap();

        assert_eq!(published, 1);
        assert!(config.build.img.join("images/logo.svg").exists());
        assert!(!config.build.img.join("svg/marker.svg").exists());
    }

    #[test]
    fn passes_unknown_formats_through() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        fs::create_dir_all(config.src.img.join("favicon")).unwrap();
        fs::write(config.src.img.join("favicon/site.webmanifest"), "{}").unwrap();

        run(&config, &cache_at(dir.path())).unwrap();

        let out = fs::read(config.build.img.join("favicon/site.webmanifest")).unwrap();
        assert_eq!(out, b"{}");
    }

    #[test]
    fn animated_gifs_pass_through_unchanged() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        // Header plus opaque payload; a re-encode could not reproduce the
        // trailing frames byte for byte
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[0x0a, 0x00, 0x0a, 0x00, 0xf0, 0x00, 0x00, 0x3b]);

        fs::create_dir_all(config.src.img.join("images")).unwrap();
        fs::write(config.src.img.join("images/loader.gif"), &gif).unwrap();

        run(&config, &cache_at(dir.path())).unwrap();

        let out = fs::read(config.build.img.join("images/loader.gif")).unwrap();
        assert_eq!(out, gif);
    }

    #[test]
    fn optimizes_png_and_reuses_cache() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let cache = cache_at(dir.path());

        // 1x1 white pixel, deliberately re-encodable
        let mut png = Vec::new();
        image::RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255]))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        fs::create_dir_all(config.src.img.join("images")).unwrap();
        fs::write(config.src.img.join("images/dot.png"), &png).unwrap();

        run(&config, &cache).unwrap();
        let first = fs::read(config.build.img.join("images/dot.png")).unwrap();
        assert!(cache.get(ContentHash::of_bytes(&png)).is_some());

        // Second run hits the cache and produces identical output
        run(&config, &cache).unwrap();
        let second = fs::read(config.build.img.join("images/dot.png")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn corrupt_raster_fails_the_step() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        fs::create_dir_all(config.src.img.join("images")).unwrap();
        fs::write(config.src.img.join("images/broken.png"), b"not a png").unwrap();

        let result = run(&config, &cache_at(dir.path()));
        assert!(matches!(result, Err(ImageError::Optimize { .. })));
    }
}
