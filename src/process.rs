//! The `process` flow: stage, extract, validate, rename, relink, publish

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::RelinkerConfig;
use crate::error::{RelinkError, Result};
use crate::intake::{extract_archive, stage_archive, validate_structure};
use crate::transform::{RenameSet, RenameToken, rename_images, update_html};
use crate::workspace::{OutputStore, RunId, Workspace};

/// What a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub run_id: RunId,
    pub renamed: RenameSet,
    pub html_file: String,
    pub published: PathBuf,
    pub extracted: PathBuf,
}

/// Runs one archive through the whole pipeline.
///
/// Both inputs are checked before anything touches the disk. Structural
/// validation happens before the first rename.
pub fn process_archive(
    archive: Option<&Path>,
    token: Option<&str>,
    config: &RelinkerConfig,
) -> Result<ProcessReport> {
    let archive = archive.ok_or(RelinkError::MissingInput("zip file"))?;
    let token = RenameToken::new(token.unwrap_or_default())?;
    if !archive.is_file() {
        return Err(RelinkError::MissingInput("zip file"));
    }

    // Dropping the workspace on any early return removes the run directory.
    let mut workspace = Workspace::create(&config.work_root)?;
    tracing::info!(
        run = %workspace.run_id,
        archive = %archive.display(),
        token = %token,
        "processing"
    );

    let staged = stage_archive(archive, &workspace.staging_dir)?;
    extract_archive(&staged, &workspace.extract_dir)?;
    workspace.discard_staging()?;
    let contents = validate_structure(&workspace.extract_dir, &config.layout)?;

    let renamed = rename_images(&contents.images_dir, &token)?;
    update_html(&contents.html_path, &renamed)?;

    let store = OutputStore::new(&config.output_root);
    let published = store.publish(workspace.run_id, &contents.html_path)?;
    let html_file = published
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    workspace.keep();
    Ok(ProcessReport {
        run_id: workspace.run_id,
        renamed,
        html_file,
        published,
        extracted: workspace.extract_dir.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::write_zip;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> RelinkerConfig {
        RelinkerConfig {
            work_root: dir.join("uploads"),
            output_root: dir.join("processed"),
            ..RelinkerConfig::default()
        }
    }

    #[test]
    fn test_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        write_zip(
            &archive,
            &[
                ("images/logo.gif", "GIF89a"),
                ("images/notes.txt", "not an image"),
                ("index.html", r#"<img src="images/logo.gif"><a href="mylogo.gif">x</a>"#),
            ],
        );

        let report = process_archive(Some(&archive), Some("final"), &config).unwrap();

        let pairs: Vec<_> = report
            .renamed
            .iter()
            .map(|e| (e.original_name.as_str(), e.new_name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("logo.gif", "logo_final.gif")]);
        assert!(report.extracted.join("images/logo_final.gif").is_file());
        assert!(!report.extracted.join("images/logo.gif").exists());
        assert!(report.extracted.join("images/notes.txt").is_file());

        let html = fs::read_to_string(&report.published).unwrap();
        assert_eq!(
            html,
            r#"<img src="images/logo_final.gif"><a href="mylogo.gif">x</a>"#
        );

        let store = OutputStore::new(&config.output_root);
        let run = report.run_id.to_string();
        assert_eq!(report.html_file, "index.html");
        assert!(store.resolve(&run, "index.html").is_ok());
        assert!(matches!(
            store.resolve(&run, "logo_final.gif"),
            Err(RelinkError::NotFound(_))
        ));
    }

    #[test]
    fn test_no_images_leaves_html_identical() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        let html = "<p>no pictures, photo.png is just text</p>\n";
        write_zip(&archive, &[("images/", ""), ("index.html", html)]);

        let report = process_archive(Some(&archive), Some("v2"), &config).unwrap();

        assert!(report.renamed.is_empty());
        assert_eq!(fs::read_to_string(&report.published).unwrap(), html);
    }

    #[test]
    fn test_missing_inputs() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        write_zip(&archive, &[("index.html", "")]);

        assert!(matches!(
            process_archive(None, Some("v2"), &config),
            Err(RelinkError::MissingInput("zip file"))
        ));
        assert!(matches!(
            process_archive(Some(&archive), None, &config),
            Err(RelinkError::MissingInput("rename value"))
        ));
        assert!(matches!(
            process_archive(Some(&dir.path().join("nope.zip")), Some("v2"), &config),
            Err(RelinkError::MissingInput("zip file"))
        ));
        assert!(!config.work_root.exists());
    }

    #[test]
    fn test_structural_validation() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());

        let no_images = dir.path().join("no_images.zip");
        write_zip(&no_images, &[("index.html", "<p></p>")]);
        assert!(matches!(
            process_archive(Some(&no_images), Some("v2"), &config),
            Err(RelinkError::MissingImagesFolder(_))
        ));

        let no_html = dir.path().join("no_html.zip");
        write_zip(&no_html, &[("images/a.png", "png")]);
        let err = process_archive(Some(&no_html), Some("v2"), &config).unwrap_err();
        assert!(matches!(err, RelinkError::MissingHtmlFile(_)));
        assert!(!config.output_root.exists());
    }

    #[test]
    fn test_failed_runs_leave_no_workspace() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        write_zip(&archive, &[("index.html", "<p></p>")]);

        for _ in 0..3 {
            let err = process_archive(Some(&archive), Some("v2"), &config).unwrap_err();
            assert!(matches!(err, RelinkError::MissingImagesFolder(_)));
        }

        assert_eq!(fs::read_dir(&config.work_root).unwrap().count(), 0);
    }

    #[test]
    fn test_successful_run_drops_staged_archive() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        write_zip(
            &archive,
            &[("images/a.png", "png"), ("index.html", "<img src=a.png>")],
        );

        let report = process_archive(Some(&archive), Some("v2"), &config).unwrap();

        let run_dir = config.work_root.join(report.run_id.to_string());
        assert!(!run_dir.join("staging").exists());
        assert!(report.extracted.join("images/a_v2.png").is_file());
    }

    #[test]
    fn test_runs_are_isolated() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let archive = dir.path().join("site.zip");
        write_zip(
            &archive,
            &[("images/a.png", "png"), ("index.html", "<img src=a.png>")],
        );

        let first = process_archive(Some(&archive), Some("one"), &config).unwrap();
        let second = process_archive(Some(&archive), Some("two"), &config).unwrap();

        assert_ne!(first.published, second.published);
        assert_eq!(
            fs::read_to_string(&first.published).unwrap(),
            "<img src=a_one.png>"
        );
        assert_eq!(
            fs::read_to_string(&second.published).unwrap(),
            "<img src=a_two.png>"
        );
    }
}
