//! Text extraction backends.
//!
//! The pipeline only sees the [`TextExtractor`] trait; the default backend
//! shells out to the `tesseract` binary, feeding the image as an in-memory
//! PNG on stdin and reading plain text from stdout. No temp files.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};
use thiserror::Error;

/// Default language pair passed to the OCR backend; spines mix German and
/// English text.
pub const OCR_LANGUAGES: &str = "deu+eng";

/// OCR engine error types
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Failed to encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),

    #[error("OCR process I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR process exited with status {0}")]
    ProcessFailed(std::process::ExitStatus),
}

pub type Result<T> = std::result::Result<T, OcrError>;

/// One recognition attempt's engine parameters.
#[derive(Debug, Clone, Copy)]
pub struct RecognitionConfig {
    /// Tesseract page segmentation mode
    pub psm: u8,
    /// Characters the engine must never emit, if restricted
    pub char_blacklist: Option<&'static str>,
}

/// A text extraction backend. Implementations must be callable from rayon
/// worker threads.
pub trait TextExtractor: Sync {
    fn extract(&self, image: &GrayImage, config: &RecognitionConfig) -> Result<String>;
}

/// Extractor backed by the system `tesseract` binary.
pub struct TesseractExtractor {
    binary: PathBuf,
    languages: String,
}

impl TesseractExtractor {
    /// Locate `tesseract` on PATH, using the default language pair.
    pub fn discover() -> Result<Self> {
        let binary = which::which("tesseract")
            .map_err(|e| OcrError::BinaryNotFound(e.to_string()))?;
        Ok(Self {
            binary,
            languages: OCR_LANGUAGES.to_string(),
        })
    }

    /// Use an explicit binary path (tests, unusual installs).
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            languages: OCR_LANGUAGES.to_string(),
        }
    }

    /// Override the language set passed to the engine.
    pub fn with_languages(mut self, languages: &str) -> Self {
        self.languages = languages.to_string();
        self
    }

    /// Version string of the discovered binary, for diagnostics.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.binary).arg("--version").output().ok()?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.lines().next().map(|line| line.trim().to_string())
    }

    fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )?;
        Ok(buffer)
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image: &GrayImage, config: &RecognitionConfig) -> Result<String> {
        let png = Self::encode_png(image)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("stdin")
            .arg("stdout")
            .args(["-l", &self.languages])
            .args(["--oem", "1"])
            .args(["--psm", &config.psm.to_string()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(blacklist) = config.char_blacklist {
            command
                .arg("-c")
                .arg(format!("tessedit_char_blacklist={blacklist}"));
        }

        let mut child = command.spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(&png)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(OcrError::ProcessFailed(output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
