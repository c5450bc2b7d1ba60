use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::is_safe_archive_path;
use crate::error::{RelinkError, Result};

/// Where the images folder and the HTML file sit inside an extracted archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLayout {
    /// Images folder, relative to the archive root.
    pub images_dir: String,
    /// HTML document, relative to the archive root.
    pub html_file: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            html_file: "index.html".to_string(),
        }
    }
}

/// Configuration loaded from `~/.config/relinker/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelinkerConfig {
    /// Root for per-run staging and extraction directories.
    pub work_root: PathBuf,
    /// Root for per-run published output.
    pub output_root: PathBuf,
    #[serde(flatten)]
    pub layout: ArchiveLayout,
}

impl Default for RelinkerConfig {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from("uploads"),
            output_root: PathBuf::from("processed"),
            layout: ArchiveLayout::default(),
        }
    }
}

impl RelinkerConfig {
    fn validate(self, path: &Path) -> Result<Self> {
        for (key, value) in [
            ("images_dir", &self.layout.images_dir),
            ("html_file", &self.layout.html_file),
        ] {
            if value.is_empty() || !is_safe_archive_path(value) {
                return Err(RelinkError::Config {
                    path: path.to_path_buf(),
                    message: format!("{key} must be a relative path inside the archive"),
                });
            }
        }
        Ok(self)
    }
}

/// Default config location, if the XDG directories can be resolved.
pub fn config_path() -> Option<PathBuf> {
    match xdg::BaseDirectories::with_prefix("relinker") {
        Ok(dirs) => dirs.find_config_file("config.toml"),
        Err(e) => {
            tracing::debug!("no XDG config directory: {e}");
            None
        }
    }
}

/// Parses and validates config text; `path` is only used for error messages.
pub fn parse(data: &str, path: &Path) -> Result<RelinkerConfig> {
    let cfg: RelinkerConfig = toml::from_str(data).map_err(|e| RelinkError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    cfg.validate(path)
}

/// Loads configuration from `explicit`, or from the XDG location when present.
/// Falls back to built-in defaults when no file exists.
pub fn load(explicit: Option<&Path>) -> Result<RelinkerConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_path() {
            Some(path) => path,
            None => return Ok(RelinkerConfig::default()),
        },
    };

    let data = fs::read_to_string(&path).map_err(|e| RelinkError::Config {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let cfg = parse(&data, &path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let cfg = RelinkerConfig::default();
        assert_eq!(cfg.work_root, PathBuf::from("uploads"));
        assert_eq!(cfg.output_root, PathBuf::from("processed"));
        assert_eq!(cfg.layout.images_dir, "images");
        assert_eq!(cfg.layout.html_file, "index.html");
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = RelinkerConfig {
            work_root: PathBuf::from("/tmp/work"),
            output_root: PathBuf::from("/tmp/out"),
            layout: ArchiveLayout {
                images_dir: "assets/img".to_string(),
                html_file: "page.html".to_string(),
            },
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = parse(&text, Path::new("config.toml")).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg = parse("html_file = \"home.html\"\n", Path::new("config.toml")).unwrap();
        assert_eq!(cfg.layout.html_file, "home.html");
        assert_eq!(cfg.layout.images_dir, "images");
        assert_eq!(cfg.work_root, PathBuf::from("uploads"));
    }

    #[test]
    fn rejects_escaping_layout() {
        let err = parse("images_dir = \"../images\"\n", Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, RelinkError::Config { .. }));
    }

    #[test]
    fn load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relinker.toml");
        fs::write(&path, "output_root = \"done\"\n").unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.output_root, PathBuf::from("done"));

        let err = load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, RelinkError::Config { .. }));
    }
}
