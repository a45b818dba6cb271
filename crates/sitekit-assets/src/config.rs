//! Site configuration loaded from `site.toml`.
//!
//! Every path a task touches comes from this one mapping. It is loaded once
//! at process start and passed by reference to every task; no task reads
//! ambient global state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default location of the svg4everybody runtime polyfill, the optional
/// second script entry.
const SVG_POLYFILL_ENTRY: &str = "src/libs/svg4everybody/svg4everybody.min.js";

/// Site configuration (site.toml).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default)]
    pub src: SrcPaths,

    #[serde(default)]
    pub build: BuildPaths,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Source tree paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SrcPaths {
    /// Stylesheet sources (nested CSS, entry `main.scss`)
    #[serde(default = "default_src_scss")]
    pub scss: PathBuf,

    /// Compiled stylesheet output consumed by the dev server and dist step
    #[serde(default = "default_src_css")]
    pub css: PathBuf,

    /// Script sources and bundled output
    #[serde(default = "default_src_js")]
    pub js: PathBuf,

    /// Markup root (also the dev server document root)
    #[serde(default = "default_src_home")]
    pub home: PathBuf,

    /// Font files copied verbatim into the distribution
    #[serde(default = "default_src_fonts")]
    pub fonts: PathBuf,

    /// Image root; `svg/` beneath it holds sprite icon sources
    #[serde(default = "default_src_img")]
    pub img: PathBuf,
}

/// Build output paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildPaths {
    /// Distribution root
    #[serde(default = "default_build_home")]
    pub home: PathBuf,

    /// Optimized image output
    #[serde(default = "default_build_img")]
    pub img: PathBuf,

    /// Stylesheet destination within the distribution
    #[serde(default = "default_build_css")]
    pub css: PathBuf,

    /// Script destination within the distribution
    #[serde(default = "default_build_js")]
    pub js: PathBuf,
}

/// Script bundling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Entry files, concatenated in declaration order
    #[serde(default = "default_script_entries")]
    pub entries: Vec<PathBuf>,

    /// Prepend the svg4everybody polyfill (needed by store-mode sprites)
    #[serde(default)]
    pub svg_polyfill: bool,
}

/// Image cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_src_scss() -> PathBuf {
    PathBuf::from("src/scss")
}
fn default_src_css() -> PathBuf {
    PathBuf::from("src/css")
}
fn default_src_js() -> PathBuf {
    PathBuf::from("src/js")
}
fn default_src_home() -> PathBuf {
    PathBuf::from("src")
}
fn default_src_fonts() -> PathBuf {
    PathBuf::from("src/fonts")
}
fn default_src_img() -> PathBuf {
    PathBuf::from("src/img")
}
fn default_build_home() -> PathBuf {
    PathBuf::from("dist")
}
fn default_build_img() -> PathBuf {
    PathBuf::from("dist/img")
}
fn default_build_css() -> PathBuf {
    PathBuf::from("dist/css")
}
fn default_build_js() -> PathBuf {
    PathBuf::from("dist/js")
}
fn default_script_entries() -> Vec<PathBuf> {
    vec![PathBuf::from("src/js/scripts.js")]
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".sitekit-cache")
}

impl Default for SrcPaths {
    fn default() -> Self {
        Self {
            scss: default_src_scss(),
            css: default_src_css(),
            js: default_src_js(),
            home: default_src_home(),
            fonts: default_src_fonts(),
            img: default_src_img(),
        }
    }
}

impl Default for BuildPaths {
    fn default() -> Self {
        Self {
            home: default_build_home(),
            img: default_build_img(),
            css: default_build_css(),
            js: default_build_js(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entries: default_script_entries(),
            svg_polyfill: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl SiteConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Entry stylesheet path.
    pub fn style_entry(&self) -> PathBuf {
        self.src.scss.join("main.scss")
    }

    /// Compiled stylesheet artifact path.
    pub fn style_output(&self) -> PathBuf {
        self.src.css.join("main.min.css")
    }

    /// Script entries in concatenation order, polyfill first when enabled.
    pub fn script_entries(&self) -> Vec<PathBuf> {
        let mut entries = Vec::with_capacity(self.scripts.entries.len() + 1);
        if self.scripts.svg_polyfill {
            entries.push(PathBuf::from(SVG_POLYFILL_ENTRY));
        }
        entries.extend(self.scripts.entries.iter().cloned());
        entries
    }

    /// Bundled script artifact path.
    pub fn script_output(&self) -> PathBuf {
        self.src.js.join("scripts.min.js")
    }

    /// Entry markup file.
    pub fn markup_entry(&self) -> PathBuf {
        self.src.home.join("index.html")
    }

    /// Icon source directory for sprite assembly.
    pub fn icon_dir(&self) -> PathBuf {
        self.src.img.join("svg")
    }

    /// Assembled sprite path. A source asset: the build workflow copies it
    /// into the image output tree afterwards.
    pub fn sprite_output(&self) -> PathBuf {
        self.src.img.join("sprite.svg")
    }

    /// Template the symbol-mode sprite renders its style fragment from.
    pub fn sprite_template(&self) -> PathBuf {
        self.src
            .home
            .join("libs/svg4everybody/templates/_sprite_template.scss")
    }

    /// Destination of the rendered style fragment.
    pub fn sprite_style_output(&self) -> PathBuf {
        self.src.home.join("libs/svg4everybody/_sprite.scss")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_mirror_original_layout() {
        let config = SiteConfig::default();

        assert_eq!(config.style_entry(), PathBuf::from("src/scss/main.scss"));
        assert_eq!(config.style_output(), PathBuf::from("src/css/main.min.css"));
        assert_eq!(config.script_output(), PathBuf::from("src/js/scripts.min.js"));
        assert_eq!(config.markup_entry(), PathBuf::from("src/index.html"));
        assert_eq!(config.icon_dir(), PathBuf::from("src/img/svg"));
        assert_eq!(config.sprite_output(), PathBuf::from("src/img/sprite.svg"));
        assert_eq!(config.build.home, PathBuf::from("dist"));
        assert_eq!(config.build.img, PathBuf::from("dist/img"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = SiteConfig::load(Path::new("/nonexistent/site.toml")).unwrap();
        assert_eq!(config.build.home, PathBuf::from("dist"));
    }

    #[test]
    fn loads_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[build]\nhome = \"out\"\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();

        assert_eq!(config.build.home, PathBuf::from("out"));
        // Untouched sections keep their defaults
        assert_eq!(config.src.img, PathBuf::from("src/img"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[src]\nsass = \"src/sass\"\n").unwrap();

        let result = SiteConfig::load(&path);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn polyfill_toggle_prepends_entry() {
        let mut config = SiteConfig::default();
        assert_eq!(config.script_entries().len(), 1);

        config.scripts.svg_polyfill = true;
        let entries = config.script_entries();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].to_string_lossy().contains("svg4everybody"));
        assert_eq!(entries[1], PathBuf::from("src/js/scripts.js"));
    }
}
