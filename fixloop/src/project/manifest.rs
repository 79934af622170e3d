//! Makefile source-list editing
//!
//! Only one edit is ever needed: make sure a source path is listed. The
//! insertion goes under the most specific list label that exists as a
//! backslash-continued list, so the new entry becomes the list's first line.

use crate::error::{FixError, FixResult};
use regex::Regex;

/// What `register_source` did to the manifest text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The path was already referenced; manifest unchanged
    AlreadyListed,
    /// Inserted as the first entry of a continued list
    Inserted { label: String, manifest: String },
    /// No continued list found; an `+=` line was appended
    Appended { label: String, manifest: String },
}

impl Registration {
    /// New manifest contents, if anything changed
    pub fn manifest(&self) -> Option<&str> {
        match self {
            Self::AlreadyListed => None,
            Self::Inserted { manifest, .. } | Self::Appended { manifest, .. } => Some(manifest),
        }
    }
}

/// Number of whitespace-delimited manifest tokens equal to `reference`. A
/// line-continuation backslash glued to a token is not part of it.
pub fn reference_count(manifest: &str, reference: &str) -> usize {
    manifest
        .split_whitespace()
        .filter(|token| token.trim_end_matches('\\') == reference)
        .count()
}

fn list_start(label: &str) -> FixResult<Regex> {
    let pattern = format!(
        r"(?m)^[ \t]*{}[ \t]*(?::=|\+=|\?=|=)[ \t]*\\",
        regex::escape(label)
    );
    Regex::new(&pattern).map_err(|e| FixError::pattern(label, e))
}

/// Ensure `reference` is listed in `manifest`.
///
/// Tries `primary` first, then `fallback`; if neither exists as a continued
/// list, appends `<fallback> += <reference>`.
pub fn register_source(
    manifest: &str,
    reference: &str,
    primary: &str,
    fallback: &str,
) -> FixResult<Registration> {
    if reference_count(manifest, reference) > 0 {
        return Ok(Registration::AlreadyListed);
    }

    for label in [primary, fallback] {
        let re = list_start(label)?;
        if let Some(m) = re.find(manifest) {
            let mut updated = String::with_capacity(manifest.len() + reference.len() + 8);
            updated.push_str(&manifest[..m.end()]);
            updated.push_str(&format!("\n    {} \\", reference));
            updated.push_str(&manifest[m.end()..]);
            return Ok(Registration::Inserted {
                label: label.to_string(),
                manifest: updated,
            });
        }
    }

    let mut updated = manifest.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("{} += {}\n", fallback, reference));
    Ok(Registration::Appended {
        label: fallback.to_string(),
        manifest: updated,
    })
}
