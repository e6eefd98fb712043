//! Locates the Tesseract executable and trained data, downloading the
//! trained data for the configured language when it is missing.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::automation::config::OcrConfig;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(windows)]
const COMMON_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const COMMON_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Directory for locally provisioned Tesseract files.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("captcha-solver")
        .join("tesseract")
}

fn traineddata_file(language: &str) -> String {
    format!("{}.traineddata", language)
}

pub fn traineddata_url(language: &str) -> String {
    format!("{}/{}", TESSDATA_REPO, traineddata_file(language))
}

/// Finds the Tesseract executable: configured path, local dir, `PATH`,
/// then common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured tesseract path {} does not exist", path.display());
    }

    let local = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local.exists() {
        return Ok(local);
    }

    if let Ok(output) = std::process::Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_INSTALL_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(EXECUTABLE_NAME))
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Directories searched for trained data, in priority order.
fn tessdata_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = configured {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.extend(COMMON_TESSDATA_DIRS.iter().map(PathBuf::from));
    candidates
}

/// First candidate directory holding `<language>.traineddata`.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let file = traineddata_file(language);
    tessdata_candidates(configured)
        .into_iter()
        .find(|dir| dir.join(&file).exists())
}

/// Downloads `<language>.traineddata` into `tessdata_dir`.
fn download_traineddata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let url = traineddata_url(language);
    let target = tessdata_dir.join(traineddata_file(language));
    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let response = client
        .get(&url)
        .header("User-Agent", "captcha-solver")
        .send()
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            traineddata_file(language),
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", traineddata_file(language), bytes.len());
    Ok(())
}

/// Resolves the executable and trained data, fetching trained data if needed.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;

    let tessdata = match find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language) {
        Some(dir) => dir,
        None => {
            let dir = config
                .tessdata_dir
                .clone()
                .unwrap_or_else(|| get_tesseract_dir().join("tessdata"));
            info!(
                "{} not found locally, fetching into {}",
                traineddata_file(&config.language),
                dir.display()
            );
            fs::create_dir_all(&dir)?;
            download_traineddata(&dir, &config.language)?;
            dir
        }
    };

    info!(
        "Tesseract ready: {} (tessdata {})",
        executable.display(),
        tessdata.display()
    );
    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_tessdata_wins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zzq.traineddata"), b"fake").unwrap();

        assert_eq!(
            find_tessdata_dir(Some(dir.path()), "zzq"),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_missing_language_not_found() {
        let dir = tempdir().unwrap();
        assert_eq!(find_tessdata_dir(Some(dir.path()), "no_such_language_xx"), None);
    }

    #[test]
    fn test_configured_executable_used_when_present() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join(EXECUTABLE_NAME);
        fs::write(&exe, b"").unwrap();

        assert_eq!(find_tesseract_executable(Some(&exe)).unwrap(), exe);
    }

    #[test]
    fn test_traineddata_url() {
        assert_eq!(
            traineddata_url("eng"),
            "https://github.com/tesseract-ocr/tessdata/raw/main/eng.traineddata"
        );
    }
}
