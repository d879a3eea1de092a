//! Turning an uploaded file into text for the context store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use super::config::path_display;
use super::context::ExtractedDocument;
use crate::utils::line_editor::LineEditorError;

/// Extensions offered by the upload prompt.
pub const ACCEPTED_EXTENSIONS: [&str; 7] = ["pdf", "txt", "md", "json", "js", "ts", "tsx"];

pub const PDF_MIME: &str = "application/pdf";

const PDF_TOOL: &str = "pdftotext";

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Could not read {}: {source}", path_display(.path))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a regular file", path_display(.0))]
    NotAFile(PathBuf),

    #[error("{0} is not valid UTF-8 text")]
    NotText(String),

    #[error("PDF extraction needs the `pdftotext` tool (poppler-utils), which was not found")]
    PdfToolMissing,

    #[error("PDF extraction failed for {name}: {reason}")]
    Pdf { name: String, reason: String },

    #[error("file prompt failed: {0}")]
    Prompt(#[from] LineEditorError),
}

/// Where uploads come from: a picker plus a file to text conversion.
pub trait FileSource {
    /// Ask the user for a file. `Ok(None)` means the user cancelled.
    fn select_file(&mut self) -> Result<Option<PathBuf>, FileError>;

    fn extract_text(&self, path: &Path) -> Result<ExtractedDocument, FileError> {
        extract_document(path)
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("js") => "text/javascript",
        Some("ts") => "text/typescript",
        Some("tsx") => "text/tsx",
        _ => "text/plain",
    }
}

pub fn is_accepted(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Read `path` as a document. PDFs go through `pdftotext`; everything else
/// must be UTF-8 text and is taken verbatim.
pub fn extract_document(path: &Path) -> Result<ExtractedDocument, FileError> {
    let metadata = fs::metadata(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(FileError::NotAFile(path.to_path_buf()));
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_for_path(path);

    let content = if mime_type == PDF_MIME {
        format_pdf_pages(&run_pdftotext(path, &name)?)
    } else {
        let bytes = fs::read(path).map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| FileError::NotText(name.clone()))?
    };

    info!(%name, mime_type, chars = content.chars().count(), "extracted document");
    Ok(ExtractedDocument {
        name,
        mime_type: mime_type.to_string(),
        content: content.trim().to_string(),
    })
}

fn run_pdftotext(path: &Path, name: &str) -> Result<String, FileError> {
    debug!(path = %path.display(), tool = PDF_TOOL, "extracting pdf text");
    let output = Command::new(PDF_TOOL)
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => FileError::PdfToolMissing,
            _ => FileError::Pdf {
                name: name.to_string(),
                reason: err.to_string(),
            },
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FileError::Pdf {
            name: name.to_string(),
            reason: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Label each form-feed separated page with `[Page N]`.
pub fn format_pdf_pages(raw: &str) -> String {
    let mut pages: Vec<&str> = raw.split('\u{c}').collect();
    if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    pages
        .iter()
        .enumerate()
        .map(|(index, page)| format!("[Page {}]\n{}\n\n", index + 1, page.trim()))
        .collect()
}
