//! Markup transform: strip HTML comments and collapse whitespace.
//!
//! Only used by the build workflow; during development the dev server serves
//! the markup tree verbatim.

use std::fs;
use std::path::PathBuf;

use crate::config::SiteConfig;
use crate::util::write_atomic;

/// Errors that can occur in the markup transform.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Remove `<!-- ... -->` comments. An unterminated comment is dropped to the
/// end of input, matching how browsers recover.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => return out,
        }
    }

    out.push_str(rest);
    out
}

/// Collapse whitespace runs to a single space; inter-tag whitespace is
/// removed entirely.
fn collapse_whitespace(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pending_space = false;

    for c in source.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if !(out.ends_with('>') && c == '<') && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }

    out
}

/// Minify a markup document.
pub fn minify_markup(source: &str) -> String {
    collapse_whitespace(&strip_comments(source))
}

/// Run the markup transform: `<home>/index.html` -> `<build-home>/index.html`.
///
/// Returns the artifact path.
pub fn run(config: &SiteConfig) -> Result<PathBuf, MarkupError> {
    let entry = config.markup_entry();
    let source = fs::read_to_string(&entry).map_err(|source| MarkupError::Read {
        path: entry.clone(),
        source,
    })?;

    let minified = minify_markup(&source);

    let output = config.build.home.join("index.html");
    write_atomic(&output, minified.as_bytes()).map_err(|source| MarkupError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!("Minified {} -> {}", entry.display(), output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_comments() {
        let html = "<p>hi</p><!-- note --><p>bye</p>";
        assert_eq!(minify_markup(html), "<p>hi</p><p>bye</p>");
    }

    #[test]
    fn drops_unterminated_comment() {
        let html = "<p>hi</p><!-- dangling";
        assert_eq!(minify_markup(html), "<p>hi</p>");
    }

    #[test]
    fn collapses_whitespace() {
        let html = "<div>\n    <span>a   b</span>\n</div>";
        assert_eq!(minify_markup(html), "<div><span>a b</span></div>");
    }

    #[test]
    fn writes_artifact() {
        let dir = tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.src.home = dir.path().join("src");
        config.build.home = dir.path().join("dist");

        fs::create_dir_all(&config.src.home).unwrap();
        fs::write(
            config.markup_entry(),
            "<!doctype html>\n<!-- banner -->\n<html>  <body>ok</body>  </html>",
        )
        .unwrap();

        let artifact = run(&config).unwrap();
        let written = fs::read_to_string(artifact).unwrap();

        assert!(!written.contains("banner"));
        assert!(written.contains("<html><body>ok</body></html>"));
    }
}
