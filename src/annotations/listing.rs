//! Annotation Listings
//!
//! Loads an already-extracted annotation sequence from disk. Three formats
//! are accepted, chosen by file extension:
//!
//! - `.yaml` / `.yml`: a sequence of annotation records
//! - `.json`: the same records as a JSON array
//! - anything else: one YW comment per line (`@begin main`, `@out result`, ...)

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::{Annotation, SourceLocation};
use crate::error::{Error, Result};

/// Loads annotations from a listing file.
///
/// # Example
///
/// ```rust,no_run
/// use yesworkflow::annotations::load_annotations;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let annotations = load_annotations("script.yw")?;
///     println!("Loaded {} annotations", annotations.len());
///     Ok(())
/// }
/// ```
pub fn load_annotations(path: &str) -> Result<Vec<Annotation>> {
    info!("Loading annotations from: {}", path);

    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    debug!("Listing loaded ({} bytes)", content.len());

    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let annotations: Vec<Annotation> = match extension.as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("json") => serde_json::from_str(&content)?,
        _ => parse_listing(&content, Some(path))?,
    };

    info!("Loaded {} annotations", annotations.len());
    Ok(annotations)
}

/// Parses a plain-text listing with one YW comment per line.
///
/// Blank lines and lines starting with `#` are skipped. Locations carry the
/// 1-based line number within the listing.
pub fn parse_listing(text: &str, source: Option<&str>) -> Result<Vec<Annotation>> {
    let mut annotations = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let location = match source {
            Some(source) => SourceLocation::in_source(source, index + 1),
            None => SourceLocation::line(index + 1),
        };
        let annotation = Annotation::parse_comment(line, location).map_err(Error::from)?;
        annotations.push(annotation);
    }

    Ok(annotations)
}

/// Saves annotations as a YAML listing.
pub fn save_annotations(annotations: &[Annotation], path: &str) -> Result<()> {
    let yaml_content = serde_yaml::to_string(annotations)?;
    fs::write(path, yaml_content).map_err(|e| Error::io(path, e))?;
    info!("Annotations saved to: {}", path);
    Ok(())
}
