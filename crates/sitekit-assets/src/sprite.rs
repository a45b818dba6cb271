//! SVG sprite assembler.
//!
//! Merges the icons under `<img>/svg/` into a single sprite document. Two
//! variants exist: symbol mode (one `<symbol>` per icon plus a rendered style
//! fragment) and the deprecated store mode (one top-level `<g>` per icon,
//! which needs the svg4everybody runtime polyfill; see the
//! `[scripts] svg_polyfill` toggle).
//!
//! Each icon is minified (declaration, comments and insignificant whitespace
//! dropped) and stripped of `fill`, `stroke` and `style` attributes so sprite
//! consumers control styling externally.

use std::fs;
use std::path::PathBuf;

use minijinja::{context, Environment};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::config::SiteConfig;
use crate::util::write_atomic;

/// Fallback style template used when the project does not ship one.
const DEFAULT_STYLE_TEMPLATE: &str = r#"// Generated from the assembled SVG sprite. Do not edit.
$sprite: '../../img/sprite.svg';
$sprite-icons: ({% for icon in icons %}'{{ icon }}'{% if not loop.last %}, {% endif %}{% endfor %});
"#;

/// Sprite assembly variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteMode {
    /// `<symbol>` per icon; also renders the style-template fragment.
    Symbol,
    /// One identified `<g>` per icon in a hidden document. Deprecated.
    Store,
}

/// Errors that can occur during sprite assembly.
#[derive(Debug, thiserror::Error)]
pub enum SpriteError {
    #[error("Icon directory not found: {0}")]
    IconDirMissing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed SVG {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("Failed to render style template: {0}")]
    Template(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An icon reduced to a bare shape, ready for assembly.
#[derive(Debug)]
struct CleanIcon {
    /// Identifier, taken from the source file stem
    id: String,
    /// The root element's viewBox, if any
    view_box: Option<String>,
    /// Serialized inner markup with presentation attributes removed
    body: String,
}

/// Copy an element's attributes, dropping `fill`, `stroke` and `style`.
fn strip_presentation(e: &BytesStart) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in e.attributes().flatten() {
        if matches!(attr.key.as_ref(), b"fill" | b"stroke" | b"style") {
            continue;
        }
        out.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    out
}

/// Extract an attribute's value from an element.
fn attribute_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Minify one icon document and strip its presentation attributes.
///
/// The root `<svg>` element is unwrapped (its viewBox is kept for symbol
/// assembly). With `remove_style_elements`, embedded `<style>` subtrees are
/// dropped entirely.
fn clean_icon(
    id: &str,
    path: &PathBuf,
    source: &str,
    remove_style_elements: bool,
) -> Result<CleanIcon, SpriteError> {
    let xml_err = |message: String| SpriteError::Xml {
        path: path.clone(),
        message,
    };

    let mut reader = Reader::from_str(source);
    let reader_config = reader.config_mut();
    reader_config.trim_text(true);
    // Mismatched or unclosed elements must fail the task, not flow into
    // the sprite
    reader_config.check_end_names = true;

    let mut writer = Writer::new(Vec::new());
    let mut view_box = None;
    let mut depth = 0usize;
    // Depth of an embedded <style> subtree currently being skipped
    let mut skip_depth: Option<usize> = None;

    loop {
        let event = reader.read_event().map_err(|e| xml_err(e.to_string()))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                if skip_depth.is_some() {
                    continue;
                }
                if depth == 1 && e.name().as_ref() == b"svg" {
                    view_box = attribute_value(&e, b"viewBox");
                    continue;
                }
                if remove_style_elements && e.name().as_ref() == b"style" {
                    skip_depth = Some(depth);
                    continue;
                }
                writer
                    .write_event(Event::Start(strip_presentation(&e)))
                    .map_err(|e| xml_err(e.to_string()))?;
            }
            Event::Empty(e) => {
                if skip_depth.is_some() {
                    continue;
                }
                writer
                    .write_event(Event::Empty(strip_presentation(&e)))
                    .map_err(|e| xml_err(e.to_string()))?;
            }
            Event::End(e) => {
                if let Some(d) = skip_depth {
                    if depth == d {
                        skip_depth = None;
                    }
                    depth -= 1;
                    continue;
                }
                if depth == 1 {
                    // Closing the unwrapped root <svg>
                    depth -= 1;
                    continue;
                }
                writer
                    .write_event(Event::End(e))
                    .map_err(|e| xml_err(e.to_string()))?;
                depth -= 1;
            }
            Event::Text(t) => {
                if skip_depth.is_none() {
                    writer
                        .write_event(Event::Text(t))
                        .map_err(|e| xml_err(e.to_string()))?;
                }
            }
            Event::CData(t) => {
                if skip_depth.is_none() {
                    writer
                        .write_event(Event::CData(t))
                        .map_err(|e| xml_err(e.to_string()))?;
                }
            }
            Event::GeneralRef(r) => {
                if skip_depth.is_none() {
                    writer
                        .write_event(Event::GeneralRef(r))
                        .map_err(|e| xml_err(e.to_string()))?;
                }
            }
            // Minification: declaration, comments, doctype and processing
            // instructions never survive into the sprite
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    let body = String::from_utf8(writer.into_inner()).map_err(|e| SpriteError::Xml {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(CleanIcon {
        id: id.to_string(),
        view_box,
        body,
    })
}

/// Collect and clean all icons from the icon source directory, in filename
/// order for deterministic output.
fn collect_icons(config: &SiteConfig, mode: SpriteMode) -> Result<Vec<CleanIcon>, SpriteError> {
    let dir = config.icon_dir();
    if !dir.is_dir() {
        return Err(SpriteError::IconDirMissing(dir));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .map_err(|source| SpriteError::Read {
            path: dir.clone(),
            source,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "svg"))
        .collect();
    paths.sort();

    let mut icons = Vec::with_capacity(paths.len());
    for path in paths {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = fs::read_to_string(&path).map_err(|source| SpriteError::Read {
            path: path.clone(),
            source,
        })?;
        // Store mode keeps embedded <style> elements
        let remove_style_elements = mode == SpriteMode::Symbol;
        icons.push(clean_icon(&id, &path, &source, remove_style_elements)?);
    }

    Ok(icons)
}

/// Assemble the symbol-mode sprite document.
fn assemble_symbols(icons: &[CleanIcon]) -> String {
    let mut doc = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
    );
    for icon in icons {
        match &icon.view_box {
            Some(vb) => doc.push_str(&format!(r#"<symbol id="{}" viewBox="{}">"#, icon.id, vb)),
            None => doc.push_str(&format!(r#"<symbol id="{}">"#, icon.id)),
        }
        doc.push_str(&icon.body);
        doc.push_str("</symbol>");
    }
    doc.push_str("</svg>");
    // Attribute stripping can leave literal escaped '>' in text content
    doc.replace("&gt;", ">")
}

/// Assemble the store-mode sprite document: identified top-level groups in a
/// hidden document.
fn assemble_store(icons: &[CleanIcon]) -> String {
    let mut doc = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="0" height="0" style="display:none">"#,
    );
    for icon in icons {
        doc.push_str(&format!(r#"<g id="{}">"#, icon.id));
        doc.push_str(&icon.body);
        doc.push_str("</g>");
    }
    doc.push_str("</svg>");
    doc
}

/// Render the style-template fragment mapping icon ids to sprite references.
fn render_style_fragment(config: &SiteConfig, icons: &[CleanIcon]) -> Result<String, SpriteError> {
    let template_path = config.sprite_template();
    let template = if template_path.exists() {
        fs::read_to_string(&template_path).map_err(|source| SpriteError::Read {
            path: template_path.clone(),
            source,
        })?
    } else {
        DEFAULT_STYLE_TEMPLATE.to_string()
    };

    let mut env = Environment::new();
    env.add_template("sprite.scss", &template)
        .map_err(|e| SpriteError::Template(e.to_string()))?;

    let ids: Vec<&str> = icons.iter().map(|i| i.id.as_str()).collect();
    env.get_template("sprite.scss")
        .and_then(|t| t.render(context! { icons => ids }))
        .map_err(|e| SpriteError::Template(e.to_string()))
}

/// Run the sprite assembler. Returns the sprite artifact path.
///
/// Output lands in the image source directory; the build workflow later
/// copies it into the distribution.
pub fn run(config: &SiteConfig, mode: SpriteMode) -> Result<PathBuf, SpriteError> {
    let icons = collect_icons(config, mode)?;
    if icons.is_empty() {
        tracing::warn!("No icons in {}", config.icon_dir().display());
    }

    let doc = match mode {
        SpriteMode::Symbol => assemble_symbols(&icons),
        SpriteMode::Store => assemble_store(&icons),
    };

    let output = config.sprite_output();
    write_atomic(&output, doc.as_bytes()).map_err(|source| SpriteError::Write {
        path: output.clone(),
        source,
    })?;

    if mode == SpriteMode::Symbol {
        let fragment = render_style_fragment(config, &icons)?;
        let style_output = config.sprite_style_output();
        write_atomic(&style_output, fragment.as_bytes()).map_err(|source| SpriteError::Write {
            path: style_output.clone(),
            source,
        })?;
        tracing::info!("Rendered style fragment -> {}", style_output.display());
    }

    tracing::info!(
        "Assembled {} icons -> {}",
        icons.len(),
        output.display()
    );
    Ok(output)
}
