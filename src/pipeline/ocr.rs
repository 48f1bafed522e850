//! OCR via `ocrmypdf`: adds a searchable text layer to the assembled PDF.

use crate::config::DownloadConfig;
use crate::error::BoxPdfError;
use crate::pipeline::tool::run_tool;
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info};

const OCRMYPDF_HINT: &str = "Install with: brew install ocrmypdf (macOS) or apt install ocrmypdf (Debian/Ubuntu)";

/// Arguments for one ocrmypdf pass.
///
/// `--skip-text` leaves pages that already carry text alone, and
/// `--optimize 0` keeps the page images untouched.
pub fn ocr_args(language: &str, jobs: usize, input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "--language".into(),
        language.into(),
        "--optimize".into(),
        "0".into(),
        "--skip-text".into(),
        "--jobs".into(),
        jobs.to_string().into(),
        input.as_os_str().to_owned(),
        output.as_os_str().to_owned(),
    ]
}

/// Run OCR on `input`, writing the text-layered copy to `output`.
///
/// Checks `ocrmypdf --version` first so a missing install is reported as
/// [`BoxPdfError::ToolNotFound`] rather than as a failed OCR pass.
pub async fn ocr_pdf(
    input: &Path,
    output: &Path,
    config: &DownloadConfig,
) -> Result<(), BoxPdfError> {
    let version = run_tool(&config.ocr_program, ["--version"], OCRMYPDF_HINT).await?;
    debug!("ocrmypdf {}", version.trim());

    info!(
        "Running OCR on {} (language: {})",
        input.display(),
        config.ocr_language
    );
    let tmp_path = output.with_extension("pdf.tmp");
    let args = ocr_args(&config.ocr_language, config.ocr_jobs, input, &tmp_path);
    if let Err(e) = run_tool(&config.ocr_program, args, OCRMYPDF_HINT).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp_path, output)
        .await
        .map_err(|e| BoxPdfError::io(output, e))?;
    info!("OCR complete: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn args_match_ocrmypdf_cli() {
        let args = ocr_args("eng+deu", 4, Path::new("in.pdf"), Path::new("out.pdf"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "--language",
                "eng+deu",
                "--optimize",
                "0",
                "--skip-text",
                "--jobs",
                "4",
                "in.pdf",
                "out.pdf"
            ]
        );
    }

    #[tokio::test]
    async fn missing_ocrmypdf_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = DownloadConfig::builder()
            .ocr(true)
            .ocr_program(PathBuf::from("/definitely/not/here/ocrmypdf"))
            .build()
            .unwrap();
        let err = ocr_pdf(
            &dir.path().join("a.pdf"),
            &dir.path().join("a_ocr.pdf"),
            &config,
        )
        .await
        .unwrap_err();
        match err {
            BoxPdfError::ToolNotFound { hint, .. } => assert!(hint.contains("ocrmypdf")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
