use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use super::setup::TesseractPaths;

/// Letters and digits only.
pub const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Treat the image as a single text line.
pub const PAGE_SEG_MODE: &str = "7";

/// External OCR engine. Implementations are configured once at
/// construction and never mutated afterwards, so one instance can be
/// shared by concurrent calls.
pub trait OcrEngine: Send + Sync {
    fn process(&self, img: &GrayImage) -> Result<String>;
}

/// Runs the Tesseract CLI on a temporary PNG and reads text from stdout.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths, language: &str) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: language.to_string(),
        }
    }

    fn command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input)
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(PAGE_SEG_MODE)
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", CHAR_WHITELIST));
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn process(&self, img: &GrayImage) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let output = self
            .command(temp_input.path())
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Tesseract output: {:?}", text);
        Ok(text)
    }
}
