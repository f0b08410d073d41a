//! PDF rasterization through an external tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{PipelineError, Result};

/// Default rasterization resolution (DPI).
pub const DEFAULT_RESOLUTION: u32 = 150;

const POPPLER_HINT: &str = "Install poppler-utils (e.g. `sudo apt-get install -y poppler-utils`) \
                            or provide a directory of pre-split page images.";

/// Turns a PDF into one image per page.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the PDF, if it can be determined.
    async fn page_count(&self, pdf: &Path) -> Result<Option<u32>>;

    /// Render every page into `out_dir` at `resolution` DPI and return the
    /// image paths in page order.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path, resolution: u32) -> Result<Vec<PathBuf>>;
}

/// Rasterizer backed by Poppler's `pdftoppm` and `pdfinfo`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    pdftoppm: String,
    pdfinfo: String,
}

impl PopplerRasterizer {
    /// Use the named binaries instead of the ones on `PATH`.
    pub fn with_tools(pdftoppm: impl Into<String>, pdfinfo: impl Into<String>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            pdfinfo: pdfinfo.into(),
        }
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::with_tools("pdftoppm", "pdfinfo")
    }
}

/// Probe a tool with `-v`, then `--version`.
async fn tool_available(tool: &str) -> bool {
    for flag in ["-v", "--version"] {
        let status = Command::new(tool)
            .arg(flag)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if matches!(status, Ok(s) if s.success()) {
            return true;
        }
    }
    false
}

/// Page number of a `pdftoppm` output file named `page-<n>.png`.
fn rasterized_page_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("page-")?.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Extract the count from `pdfinfo` output.
fn parse_pdfinfo_pages(stdout: &str) -> Option<u32> {
    let line = stdout.lines().find(|l| l.starts_with("Pages:"))?;
    let digits: String = line.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[async_trait]
impl Rasterizer for PopplerRasterizer {
    async fn page_count(&self, pdf: &Path) -> Result<Option<u32>> {
        if !tool_available(&self.pdfinfo).await {
            return Ok(None);
        }
        let output = match Command::new(&self.pdfinfo).arg(pdf).output().await {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => return Ok(None),
        };
        Ok(parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn rasterize(&self, pdf: &Path, out_dir: &Path, resolution: u32) -> Result<Vec<PathBuf>> {
        if !tool_available(&self.pdftoppm).await {
            return Err(PipelineError::ToolMissing {
                tool: self.pdftoppm.clone(),
                hint: POPPLER_HINT.to_string(),
            });
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let output = Command::new(&self.pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg(resolution.to_string())
            .arg(pdf)
            .arg(out_dir.join("page"))
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(PipelineError::ToolFailed {
                tool: self.pdftoppm.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(number) = entry.file_name().to_str().and_then(rasterized_page_number) {
                pages.push((number, entry.path()));
            }
        }
        if pages.is_empty() {
            return Err(PipelineError::NoPages("no pages generated from PDF".into()));
        }

        pages.sort_by_key(|(number, _)| *number);
        tracing::debug!(pages = pages.len(), resolution, "rasterized PDF");
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rasterized_page_number() {
        assert_eq!(rasterized_page_number("page-1.png"), Some(1));
        assert_eq!(rasterized_page_number("page-010.png"), Some(10));
        assert_eq!(rasterized_page_number("page-.png"), None);
        assert_eq!(rasterized_page_number("page-1.jpg"), None);
        assert_eq!(rasterized_page_number("cover-1.png"), None);
        assert_eq!(rasterized_page_number("page-1a.png"), None);
    }

    #[test]
    fn test_numeric_ordering() {
        let mut names = vec!["page-10.png", "page-2.png", "page-1.png"];
        names.sort_by_key(|n| rasterized_page_number(n));
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    proptest::proptest! {
        #[test]
        fn test_rasterized_page_number_any(n in 1u32..=u32::MAX, width in 0usize..6) {
            let name = format!("page-{n:0width$}.png");
            proptest::prop_assert_eq!(rasterized_page_number(&name), Some(n));
        }
    }

    #[test]
    fn test_parse_pdfinfo_pages() {
        let stdout = "Title:          Guide\nProducer:       x\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages(stdout), Some(12));
        assert_eq!(parse_pdfinfo_pages("Title: nothing\n"), None);
    }

    #[tokio::test]
    async fn test_missing_tool_is_actionable() {
        let rasterizer = PopplerRasterizer::with_tools(
            "pagevault-no-such-pdftoppm",
            "pagevault-no-such-pdfinfo",
        );
        let dir = tempfile::tempdir().unwrap();

        let err = rasterizer
            .rasterize(Path::new("in.pdf"), dir.path(), DEFAULT_RESOLUTION)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ToolMissing { .. }));
        assert!(err.to_string().contains("poppler-utils"));

        assert_eq!(
            rasterizer.page_count(Path::new("in.pdf")).await.unwrap(),
            None
        );
    }
}
