//! Archive intake: staging, extraction and structural validation

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::common::{copy_file, is_safe_archive_path};
use crate::config::ArchiveLayout;
use crate::error::{RelinkError, Result};

/// Paths of the two entries every archive must contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContents {
    pub images_dir: PathBuf,
    pub html_path: PathBuf,
}

/// Copies the uploaded archive into `staging_dir`, keeping its file name.
/// Returns the staged path.
pub fn stage_archive(archive: &Path, staging_dir: &Path) -> Result<PathBuf> {
    if !archive.is_file() {
        return Err(RelinkError::MissingInput("zip file"));
    }
    let file_name = archive
        .file_name()
        .ok_or(RelinkError::MissingInput("zip file"))?;

    let staged = staging_dir.join(file_name);
    copy_file(archive, &staged)?;
    tracing::debug!(from = %archive.display(), to = %staged.display(), "staged archive");

    Ok(staged)
}

/// Extracts every entry of `archive` under `dest`.
/// Entries that would land outside `dest` are skipped. Returns the number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive)
        .map_err(|e| RelinkError::io("Failed to open input file", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|source| RelinkError::Archive {
        path: archive.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(dest)
        .map_err(|e| RelinkError::io("Failed to create extraction directory", dest, e))?;

    let mut written = 0usize;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|source| RelinkError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;

        // Defense-in-depth: the string check and enclosed_name must both agree
        let relative = match entry.enclosed_name() {
            Some(path) if is_safe_archive_path(entry.name()) => path,
            _ => {
                tracing::warn!(entry = entry.name(), "skipping unsafe archive entry");
                continue;
            }
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| RelinkError::io("Failed to create directory", &out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RelinkError::io("Failed to create directory", parent, e))?;
        }

        let outfile = fs::File::create(&out_path)
            .map_err(|e| RelinkError::io("Failed to create output file", &out_path, e))?;
        let mut outfile = io::BufWriter::new(outfile);
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| RelinkError::io("Failed to extract", &out_path, e))?;

        written += 1;
    }

    tracing::info!(files = written, dest = %dest.display(), "extracted archive");
    Ok(written)
}

/// Checks that the extracted tree has the images folder and the HTML file.
/// Nothing is modified, so a failure here leaves the tree as extracted.
pub fn validate_structure(root: &Path, layout: &ArchiveLayout) -> Result<ArchiveContents> {
    let images_dir = root.join(&layout.images_dir);
    let html_path = root.join(&layout.html_file);

    if !images_dir.is_dir() {
        return Err(RelinkError::MissingImagesFolder(layout.images_dir.clone()));
    }
    if !html_path.is_file() {
        return Err(RelinkError::MissingHtmlFile(layout.html_file.clone()));
    }

    Ok(ArchiveContents {
        images_dir,
        html_path,
    })
}
