//! Common utilities shared between the intake, transform and output stages

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{RelinkError, Result};

/// Image file suffixes that get renamed. Matching is case-sensitive.
pub const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];

/// Returns true if `name` ends with one of the recognized image suffixes
pub fn is_image_file(name: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Splits a file name at its last '.' into (base, extension).
/// The extension keeps its leading dot; a name without a dot has an empty extension.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

/// Builds `<base>_<token><ext>` from an image file name
pub fn renamed_file_name(name: &str, token: &str) -> String {
    let (base, ext) = split_file_name(name);
    format!("{}_{}{}", base, token, ext)
}

/// Returns false for characters that cannot appear in a single path component
fn is_forbidden_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '\0') || c.is_control()
}

/// Returns true if `name` is usable as one path component on its own
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.chars().any(is_forbidden_char)
}

/// Rejects archive entry names that could escape the extraction directory
pub fn is_safe_archive_path(name: &str) -> bool {
    !name.starts_with('/')
        && !name.starts_with('\\')
        && !name.split(['/', '\\']).any(|part| part == "..")
}

/// Copies a file through a buffered writer, creating or truncating the target
pub fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let mut infile =
        fs::File::open(from).map_err(|e| RelinkError::io("Failed to open", from, e))?;
    let outfile =
        fs::File::create(to).map_err(|e| RelinkError::io("Failed to create output file", to, e))?;
    let mut outfile = io::BufWriter::new(outfile);

    io::copy(&mut infile, &mut outfile).map_err(|e| RelinkError::io("Failed to write", to, e))
}
