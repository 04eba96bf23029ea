//! Resume text extraction.
//!
//! The resume lives in a directory of PDF files. Every `*.pdf` in it is read,
//! in file name order, and the page texts are concatenated.

use anyhow::{bail, Context, Result};
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// PDF files directly inside `dir`, sorted by file name.
pub fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Resume directory does not exist: {:?}", dir);
    }

    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))?
    {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Text of one PDF, pages joined with newlines. Pages that fail to decode
/// are skipped.
pub fn pdf_text(path: &Path) -> Result<String> {
    let doc = Document::load(path).with_context(|| format!("Failed to open PDF {:?}", path))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!(
                "Skipping unreadable page {} of {:?}: {}",
                page_number, path, e
            ),
        }
    }
    Ok(pages.join("\n"))
}

/// Concatenated text of every resume PDF in `dir`.
///
/// Files that cannot be opened are logged and skipped; the result is empty
/// when nothing could be read.
pub fn load_resume_text(dir: &Path) -> Result<String> {
    let files = pdf_files(dir)?;
    if files.is_empty() {
        warn!("No PDF files found in {:?}", dir);
    }

    let mut parts = Vec::new();
    for file in &files {
        match pdf_text(file) {
            Ok(text) => {
                debug!("Read {} characters from {:?}", text.len(), file);
                parts.push(text);
            }
            Err(e) => warn!("Skipping resume file: {:#}", e),
        }
    }

    let text = parts.join("\n");
    info!(
        "Loaded resume text from {} of {} files ({} characters)",
        parts.len(),
        files.len(),
        text.len()
    );
    Ok(text)
}
