//! XML Schema inspection
//!
//! Only the top-level element declarations matter here: each one is a
//! candidate root element for instance documents of a form. Declarations
//! pulled in through `xs:include`, `xs:import` and `xs:redefine` count too,
//! as long as their `schemaLocation` is a file relative to the schema.

use roxmltree::{Document, ParsingOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Namespace of XML Schema 1.0 documents
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Names of the global element declarations of a schema
///
/// The schema's own declarations come first, in document order, followed by
/// those of the schemas it references. Referenced locations are resolved
/// against `base_dir`; without one they are not followed. A referenced
/// schema that is missing or unreadable is skipped with a warning.
pub fn root_element_names(
    content: &[u8],
    base_dir: Option<&Path>,
) -> Result<Vec<String>, SchemaError> {
    let text = std::str::from_utf8(content).map_err(|e| SchemaError::Encoding(e.to_string()))?;

    let mut names = Vec::new();
    let locations = collect_declarations(text, &mut names)?;

    match base_dir {
        Some(dir) => {
            let mut visited = HashSet::new();
            for location in locations {
                follow_reference(dir, &location, &mut visited, &mut names);
            }
        }
        None if !locations.is_empty() => {
            tracing::debug!(
                "not following {} schema reference(s) of an upload without a directory",
                locations.len()
            );
        }
        None => {}
    }

    Ok(names)
}

/// Add the global element names of one schema document to `names`
///
/// Returns the `schemaLocation` of every include, import and redefine.
fn collect_declarations(text: &str, names: &mut Vec<String>) -> Result<Vec<String>, SchemaError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| SchemaError::Malformed(e.to_string()))?;

    let root = doc.root_element();
    if root.tag_name().namespace() != Some(XS_NS) || root.tag_name().name() != "schema" {
        return Err(SchemaError::NotASchema(root.tag_name().name().to_string()));
    }

    let mut locations = Vec::new();
    for child in root
        .children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XS_NS))
    {
        match child.tag_name().name() {
            "element" => {
                if let Some(name) = child.attribute("name") {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
            "include" | "import" | "redefine" => {
                if let Some(location) = child.attribute("schemaLocation") {
                    locations.push(location.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(locations)
}

fn follow_reference(
    dir: &Path,
    location: &str,
    visited: &mut HashSet<PathBuf>,
    names: &mut Vec<String>,
) {
    if location.contains("://") {
        tracing::debug!("not following remote schema {}", location);
        return;
    }

    let path = dir.join(location);
    let canonical = match path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("cannot resolve schema {}: {}", path.display(), e);
            return;
        }
    };
    if !visited.insert(canonical.clone()) {
        return;
    }

    let text = match std::fs::read_to_string(&canonical) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("cannot read schema {}: {}", canonical.display(), e);
            return;
        }
    };
    let locations = match collect_declarations(&text, names) {
        Ok(locations) => locations,
        Err(e) => {
            tracing::warn!("skipping schema {}: {}", canonical.display(), e);
            return;
        }
    };

    let next_dir = canonical.parent().unwrap_or(dir).to_path_buf();
    for location in locations {
        follow_reference(&next_dir, &location, visited, names);
    }
}

/// Errors raised while inspecting a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("root element <{0}> is not an xs:schema")]
    NotASchema(String),
}
