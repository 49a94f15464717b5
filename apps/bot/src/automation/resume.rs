//! Resume Store — resolves the configured resume to a file and its text.
//!
//! `resume_path` may name a document or a directory. For a directory the most
//! recently modified supported document wins.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{info, warn};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("Resume path {0} does not exist")]
    NotFound(PathBuf),

    #[error("No .pdf, .txt or .md resume found in {0}")]
    EmptyDirectory(PathBuf),

    #[error("Unsupported resume format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Could not read resume: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not extract text from PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },
}

/// A resume ready for upload and prompting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeDocument {
    /// Absolute path handed to file inputs.
    pub path: PathBuf,
    pub text: String,
}

/// Resolves `configured` and loads the chosen document.
pub async fn load_resume(configured: &Path) -> Result<ResumeDocument, ResumeError> {
    let path = resolve_resume_path(configured)?;
    let text = read_text(&path).await?;
    if text.trim().is_empty() {
        warn!(
            "Resume {} has no extractable text; cover letters will be generic",
            path.display()
        );
    }
    info!("Using resume {} ({} chars)", path.display(), text.len());
    Ok(ResumeDocument { path, text })
}

/// Absolute path of the document to use.
pub fn resolve_resume_path(configured: &Path) -> Result<PathBuf, ResumeError> {
    if !configured.exists() {
        return Err(ResumeError::NotFound(configured.to_path_buf()));
    }
    let absolute = std::fs::canonicalize(configured)?;

    if absolute.is_file() {
        if !is_supported(&absolute) {
            return Err(ResumeError::UnsupportedFormat(absolute));
        }
        return Ok(absolute);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(&absolute)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or(ResumeError::EmptyDirectory(absolute))
}

fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

async fn read_text(path: &Path) -> Result<String, ResumeError> {
    match extension(path).as_deref() {
        Some("pdf") => {
            let owned = path.to_path_buf();
            // PDF parsing is CPU-bound.
            tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text(&owned).map_err(|e| ResumeError::Pdf {
                    path: owned.clone(),
                    message: e.to_string(),
                })
            })
            .await
            .map_err(|e| ResumeError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        Some("txt") | Some("md") => Ok(tokio::fs::read_to_string(path).await?),
        _ => Err(ResumeError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::time::Duration;

    use super::*;

    fn touch(path: &Path, content: &str, modified: SystemTime) {
        fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_path_is_loaded_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resume.txt");
        fs::write(&file, "Rust engineer, 5 years").unwrap();

        let doc = load_resume(&file).await.unwrap();
        assert!(doc.path.is_absolute());
        assert_eq!(doc.text, "Rust engineer, 5 years");
    }

    #[test]
    fn test_directory_picks_most_recent_supported_document() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);
        touch(&dir.path().join("old.md"), "old", base);
        touch(&dir.path().join("new.txt"), "new", base + Duration::from_secs(600));
        touch(&dir.path().join("newest.docx"), "ignored", base + Duration::from_secs(1200));

        let chosen = resolve_resume_path(dir.path()).unwrap();
        assert_eq!(chosen.file_name().unwrap(), "new.txt");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.docx"), "x").unwrap();
        assert!(matches!(
            resolve_resume_path(dir.path()),
            Err(ResumeError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(matches!(
            resolve_resume_path(Path::new("/definitely/not/here.pdf")),
            Err(ResumeError::NotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resume.docx");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            resolve_resume_path(&file),
            Err(ResumeError::UnsupportedFormat(_))
        ));
    }
}
