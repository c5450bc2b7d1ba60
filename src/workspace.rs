//! Per-run working directories and the published output area

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::common::{copy_file, is_plain_file_name};
use crate::error::{RelinkError, Result};

/// Identifies one `process` invocation; names its staging and output directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Staging and extraction directories owned by a single run.
/// The run directory is removed on drop unless [`Workspace::keep`] was called.
#[derive(Debug)]
pub struct Workspace {
    pub run_id: RunId,
    pub staging_dir: PathBuf,
    pub extract_dir: PathBuf,
    run_dir: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Allocates a fresh run under `work_root` and creates its directories
    pub fn create(work_root: &Path) -> Result<Self> {
        let run_id = RunId::new();
        let run_dir = work_root.join(run_id.to_string());
        let staging_dir = run_dir.join("staging");
        let extract_dir = run_dir.join("extracted");

        for dir in [&staging_dir, &extract_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| RelinkError::io("Failed to create working directory", dir, e))?;
        }
        tracing::debug!(run = %run_id, dir = %run_dir.display(), "allocated workspace");

        Ok(Self {
            run_id,
            staging_dir,
            extract_dir,
            run_dir,
            keep: false,
        })
    }

    /// Removes the staged archive once it has been extracted
    pub fn discard_staging(&self) -> Result<()> {
        fs::remove_dir_all(&self.staging_dir).map_err(|e| {
            RelinkError::io("Failed to remove staging directory", &self.staging_dir, e)
        })
    }

    /// Keeps the extracted tree on disk after the workspace is dropped
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.run_dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.run_dir.display(), "failed to clean up workspace: {e}");
            }
        } else {
            tracing::debug!(run = %self.run_id, "removed workspace");
        }
    }
}

/// Published files, one directory per run
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run_id: RunId) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    /// Copies `file` into the run's output directory under its own name
    pub fn publish(&self, run_id: RunId, file: &Path) -> Result<PathBuf> {
        let name = file
            .file_name()
            .ok_or_else(|| RelinkError::NotFound(file.display().to_string()))?;
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)
            .map_err(|e| RelinkError::io("Failed to create output directory", &dir, e))?;

        let target = dir.join(name);
        copy_file(file, &target)?;
        tracing::info!(run = %run_id, path = %target.display(), "published");
        Ok(target)
    }

    /// Finds a published file. Anything that is not a plain file name inside
    /// an existing run directory is reported as not found.
    pub fn resolve(&self, run: &str, name: &str) -> Result<PathBuf> {
        let not_found = || RelinkError::NotFound(name.to_string());

        let run_id = RunId::parse(run).ok_or_else(not_found)?;
        if !is_plain_file_name(name) {
            return Err(not_found());
        }

        let path = self.run_dir(run_id).join(name);
        if !path.is_file() {
            return Err(not_found());
        }
        Ok(path)
    }

    /// Copies a published file to `dest`; a directory receives it under its own name
    pub fn download_to(&self, run: &str, name: &str, dest: &Path) -> Result<PathBuf> {
        let source = self.resolve(run, name)?;
        let target = if dest.is_dir() {
            dest.join(name)
        } else {
            dest.to_path_buf()
        };

        copy_file(&source, &target)?;
        tracing::info!(from = %source.display(), to = %target.display(), "downloaded");
        Ok(target)
    }

    /// Streams a published file into `out`
    pub fn stream<W: Write>(&self, run: &str, name: &str, out: &mut W) -> Result<u64> {
        let source = self.resolve(run, name)?;
        let mut file =
            fs::File::open(&source).map_err(|e| RelinkError::io("Failed to open", &source, e))?;
        io::copy(&mut file, out).map_err(|e| RelinkError::io("Failed to stream", &source, e))
    }
}
