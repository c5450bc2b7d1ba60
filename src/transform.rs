//! Image renaming and HTML relinking

use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::{is_image_file, is_plain_file_name, renamed_file_name};
use crate::error::{RelinkError, Result};

/// Suffix appended to every image base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameToken(String);

impl RenameToken {
    pub fn new(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(RelinkError::MissingInput("rename value"));
        }
        if !is_plain_file_name(value) {
            return Err(RelinkError::InvalidToken(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One renamed image: its file name before and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    pub original_name: String,
    pub new_name: String,
}

/// Renamed images in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenameSet {
    entries: Vec<ImageEntry>,
}

impl RenameSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.iter()
    }

    fn push(&mut self, original_name: &str, new_name: String) {
        self.entries.push(ImageEntry {
            original_name: original_name.to_string(),
            new_name,
        });
    }
}

impl FromIterator<(String, String)> for RenameSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(original_name, new_name)| ImageEntry {
                    original_name,
                    new_name,
                })
                .collect(),
        }
    }
}

struct PlannedRename {
    from: PathBuf,
    to: PathBuf,
    original_name: String,
    new_name: String,
}

/// Collects every image under `images_dir` and the path it will be moved to.
/// The walk is sorted by file name so the order is stable between runs.
fn plan_renames(images_dir: &Path, token: &RenameToken) -> Result<Vec<PlannedRename>> {
    let mut planned = Vec::new();

    for entry in WalkDir::new(images_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(images_dir).to_path_buf();
            RelinkError::io("Failed to walk", path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        if !is_image_file(name) {
            continue;
        }

        let new_name = renamed_file_name(name, token.as_str());
        let from = entry.path().to_path_buf();
        let to = from.with_file_name(&new_name);
        planned.push(PlannedRename {
            from,
            to,
            original_name: name.to_string(),
            new_name,
        });
    }

    Ok(planned)
}

fn check_target_free(rename: &PlannedRename) -> Result<()> {
    if rename.to.exists() {
        return Err(RelinkError::OverwriteConflict {
            original: rename.original_name.clone(),
            target: rename.to.clone(),
        });
    }
    Ok(())
}

/// Renames every image under `images_dir` to `<base>_<token><ext>` in place.
///
/// All targets are checked before the first move, so a name collision leaves
/// the folder untouched. An I/O failure part way through does not undo the
/// renames already performed.
pub fn rename_images(images_dir: &Path, token: &RenameToken) -> Result<RenameSet> {
    let planned = plan_renames(images_dir, token)?;
    for rename in &planned {
        check_target_free(rename)?;
    }

    let mut renamed = RenameSet::default();
    for rename in planned {
        check_target_free(&rename)?;
        fs::rename(&rename.from, &rename.to)
            .map_err(|e| RelinkError::io("Failed to rename", &rename.from, e))?;
        tracing::debug!(from = %rename.from.display(), to = %rename.new_name, "renamed image");
        renamed.push(&rename.original_name, rename.new_name);
    }

    tracing::info!(count = renamed.len(), dir = %images_dir.display(), "renamed images");
    Ok(renamed)
}

/// Builds a pattern matching any original name as a whole word.
/// Longer names come first so a name is never shadowed by one of its prefixes.
fn whole_name_pattern(names: &[&str]) -> Result<Regex> {
    let mut names = names.to_vec();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names.dedup();

    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b{{start-half}}(?:{})\b{{end-half}}", alternation);

    // Names are escaped; this only fails when the set outgrows the regex size limit.
    Ok(Regex::new(&pattern)?)
}

/// Replaces every whole-word occurrence of an original name in `html` with its new name.
/// All replacements are computed against the input text in one pass.
pub fn relink_text<'a>(html: &'a str, renamed: &RenameSet) -> Result<Cow<'a, str>> {
    if renamed.is_empty() {
        return Ok(Cow::Borrowed(html));
    }

    let lookup: HashMap<&str, &str> = renamed
        .iter()
        .map(|e| (e.original_name.as_str(), e.new_name.as_str()))
        .collect();
    let names: Vec<&str> = lookup.keys().copied().collect();
    let pattern = whole_name_pattern(&names)?;

    Ok(pattern.replace_all(html, |caps: &Captures| {
        let matched = &caps[0];
        lookup.get(matched).copied().unwrap_or(matched).to_string()
    }))
}

/// Rewrites the HTML file at `html_path` so it references the renamed images.
/// The file is left byte-for-byte untouched when nothing needs replacing.
pub fn update_html(html_path: &Path, renamed: &RenameSet) -> Result<()> {
    if renamed.is_empty() {
        tracing::info!(path = %html_path.display(), "no images renamed, HTML left as is");
        return Ok(());
    }

    let html = fs::read_to_string(html_path)
        .map_err(|e| RelinkError::io("Failed to read HTML file", html_path, e))?;

    match relink_text(&html, renamed)? {
        Cow::Borrowed(_) => {
            tracing::info!(path = %html_path.display(), "HTML has no references to renamed images");
        }
        Cow::Owned(updated) => {
            fs::write(html_path, updated)
                .map_err(|e| RelinkError::io("Failed to write HTML file", html_path, e))?;
            tracing::info!(path = %html_path.display(), "HTML relinked");
        }
    }

    Ok(())
}
