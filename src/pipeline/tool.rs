//! Running external programs (img2pdf, ocrmypdf).

use crate::error::BoxPdfError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Keep this many trailing bytes of stderr in `ToolFailed`.
const STDERR_TAIL: usize = 2000;

/// Run `program` with `args`, returning its stdout.
///
/// A missing program becomes `ToolNotFound` carrying `install_hint`; a nonzero
/// exit becomes `ToolFailed` with the tail of stderr.
pub async fn run_tool<I, S>(
    program: &Path,
    args: I,
    install_hint: &str,
) -> Result<String, BoxPdfError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program.display().to_string();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("Running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BoxPdfError::ToolNotFound {
                tool: tool.clone(),
                hint: install_hint.to_string(),
            }
        } else {
            BoxPdfError::Internal(format!("failed to start {tool}: {e}"))
        }
    })?;

    if !output.status.success() {
        return Err(BoxPdfError::ToolFailed {
            tool,
            code: output.status.code(),
            stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("…{}", &s[start..])
}
