//! Style transform: compile, vendor-prefix and minify the entry stylesheet.
//!
//! lightningcss flattens nested rules, adds vendor prefixes for the
//! configured browser range and prints minified output, standing in for the
//! original sass/autoprefixer/clean-css chain.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::SiteConfig;
use crate::util::write_atomic;

/// Browser range vendor prefixes are generated for.
const BROWSER_RANGE: &str = "last 15 versions";

/// Errors that can occur in the style transform.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Stylesheet error: {0}")]
    Compile(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Compile a stylesheet to flat, prefixed, minified CSS.
pub fn compile(source: &str) -> Result<String, StyleError> {
    let targets = Targets {
        browsers: Browsers::from_browserslist([BROWSER_RANGE])
            .map_err(|e| StyleError::Compile(e.to_string()))?,
        ..Targets::default()
    };

    // The parser recovers from bad declarations instead of returning Err, so
    // diagnostics must be collected explicitly. Any diagnostic fails the
    // transform, like a strict compiler would.
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let options = ParserOptions {
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };

    let mut stylesheet =
        StyleSheet::parse(source, options).map_err(|e| StyleError::Compile(e.to_string()))?;

    {
        let diagnostics = warnings
            .read()
            .map_err(|e| StyleError::Compile(e.to_string()))?;
        if let Some(first) = diagnostics.first() {
            return Err(StyleError::Compile(first.to_string()));
        }
    }

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Compile(e.to_string()))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Compile(e.to_string()))?;

    Ok(output.code)
}

/// Run the style transform: `<scss>/main.scss` -> `<css>/main.min.css`.
///
/// Returns the artifact path.
pub fn run(config: &SiteConfig) -> Result<PathBuf, StyleError> {
    let entry = config.style_entry();
    let source = fs::read_to_string(&entry).map_err(|source| StyleError::Read {
        path: entry.clone(),
        source,
    })?;

    let compiled = compile(&source)?;

    let output = config.style_output();
    write_atomic(&output, compiled.as_bytes()).map_err(|source| StyleError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!("Compiled {} -> {}", entry.display(), output.display());
    Ok(output)
}
