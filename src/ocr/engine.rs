//! Tesseract-backed recognizer.
//!
//! Shells out to a local Tesseract install rather than binding the C API:
//! the binary is either bundled under `<exe_dir>/tesseract/` or found on
//! PATH. Per the recognizer contract, any failure (missing binary, bad exit,
//! unreadable output) degrades to empty text.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::TextRecognizer;
use crate::capture::Frame;

/// Recognition language passed to Tesseract. The countdown and currency
/// readouts mix CJK and ASCII digits.
const OCR_LANGUAGE: &str = "chi_sim+eng";

pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
}

impl TesseractRecognizer {
    /// Locates a usable Tesseract install.
    ///
    /// Prefers a bundled copy under `<exe_dir>/tesseract/`, falling back to
    /// whatever `tesseract` resolves to on PATH.
    pub fn locate() -> Result<Self> {
        let local_dir = crate::paths::get_tesseract_dir();
        let local_exe = if cfg!(windows) {
            local_dir.join("tesseract.exe")
        } else {
            local_dir.join("tesseract")
        };

        if local_exe.exists() {
            let tessdata = local_dir.join("tessdata");
            crate::log(&format!("Using bundled tesseract: {}", local_exe.display()));
            return Ok(Self {
                executable: local_exe,
                tessdata: tessdata.exists().then_some(tessdata),
            });
        }

        // PATH lookup: probe with --version so a missing binary fails here
        // rather than on every recognition call.
        let probe = Command::new("tesseract").arg("--version").output();
        match probe {
            Ok(out) if out.status.success() => {
                crate::log("Using tesseract from PATH");
                Ok(Self {
                    executable: PathBuf::from("tesseract"),
                    tessdata: None,
                })
            }
            _ => Err(anyhow!(
                "Tesseract not found. Install it to {} or add it to PATH.",
                local_dir.display()
            )),
        }
    }

    fn run(&self, image: &Frame) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(OCR_LANGUAGE)
            .arg("--psm")
            .arg("7"); // Single text line
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &Frame) -> String {
        match self.run(image) {
            Ok(text) => text,
            Err(e) => {
                crate::log(&format!("OCR failed, treating as empty: {}", e));
                String::new()
            }
        }
    }
}
