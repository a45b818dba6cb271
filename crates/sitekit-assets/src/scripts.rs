//! Script transform: concatenate entry files in order and minify the bundle.

use std::fs;
use std::path::PathBuf;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::config::SiteConfig;
use crate::util::write_atomic;

/// Errors that can occur in the script transform.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("No script entries configured")]
    NoEntries,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to minify bundle: {0}")]
    Minify(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Minify JavaScript source.
pub fn minify_js(source: &str) -> Result<String, ScriptError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !ret.errors.is_empty() {
        let first = ret.errors.first().map(|e| e.to_string()).unwrap_or_default();
        return Err(ScriptError::Minify(first));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    Ok(code)
}

/// Concatenate sources in declaration order, separated by newlines so a
/// missing trailing semicolon in one entry cannot corrupt the next.
fn concat(sources: &[String]) -> String {
    sources.join("\n")
}

/// Run the script transform: configured entries -> `<js>/scripts.min.js`.
///
/// Returns the artifact path.
pub fn run(config: &SiteConfig) -> Result<PathBuf, ScriptError> {
    let entries = config.script_entries();
    if entries.is_empty() {
        return Err(ScriptError::NoEntries);
    }

    let mut sources = Vec::with_capacity(entries.len());
    for entry in &entries {
        let source = fs::read_to_string(entry).map_err(|source| ScriptError::Read {
            path: entry.clone(),
            source,
        })?;
        sources.push(source);
    }

    let bundle = minify_js(&concat(&sources))?;

    let output = config.script_output();
    write_atomic(&output, bundle.as_bytes()).map_err(|source| ScriptError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!("Bundled {} entries -> {}", entries.len(), output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn minifies_script() {
        let out = minify_js("console.log( 1 );  // hello").unwrap();
        assert!(out.contains("console.log(1)"));
        assert!(!out.contains("hello"));
    }

    #[test]
    fn rejects_malformed_script() {
        assert!(matches!(
            minify_js("function ("),
            Err(ScriptError::Minify(_))
        ));
    }

    #[test]
    fn concatenates_in_declaration_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "var first = 'TOKEN_A';").unwrap();
        fs::write(&b, "console.log(first, 'TOKEN_B');").unwrap();

        let mut config = SiteConfig::default();
        config.src.js = dir.path().join("out");
        config.scripts.entries = vec![a, b];

        let artifact = run(&config).unwrap();
        let bundle = fs::read_to_string(artifact).unwrap();

        let pos_a = bundle.find("TOKEN_A").expect("bundle contains A's token");
        let pos_b = bundle.find("TOKEN_B").expect("bundle contains B's token");
        assert!(pos_a < pos_b, "A must precede B in the bundle");
    }

    #[test]
    fn missing_entry_is_a_read_error() {
        let dir = tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.src.js = dir.path().join("out");
        config.scripts.entries = vec![dir.path().join("absent.js")];

        assert!(matches!(run(&config), Err(ScriptError::Read { .. })));
    }
}
