//! Pipeline inputs: a PDF, or a directory of pre-split page images.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Default extension of pre-split page images.
pub const DEFAULT_IMAGE_EXT: &str = "png";

/// Where page images come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// A PDF to rasterize.
    Pdf(PathBuf),
    /// A directory of page images.
    ImageDir(PathBuf),
}

impl PageSource {
    /// Classify an input path.
    ///
    /// A path ending in `.pdf` (any case) is a PDF; an existing directory is
    /// an image directory. Anything else is rejected.
    pub fn detect(input: &Path) -> Result<Self> {
        if !input.exists() {
            return Err(PipelineError::InputNotFound(input.to_path_buf()));
        }
        if is_pdf(input) {
            return Ok(PageSource::Pdf(input.to_path_buf()));
        }
        if input.is_dir() {
            return Ok(PageSource::ImageDir(input.to_path_buf()));
        }
        Err(PipelineError::UnsupportedInput(input.to_path_buf()))
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// List page images in a directory, sorted lexicographically by file name.
///
/// Only regular files whose name ends in `.<ext>` are kept. An empty result
/// is an error.
pub async fn collect_images(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{}", ext.trim_start_matches('.'));

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(&suffix) {
                names.push(name.to_string());
            }
        }
    }

    if names.is_empty() {
        return Err(PipelineError::NoPages(format!(
            "no {suffix} images in input directory"
        )));
    }

    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}
