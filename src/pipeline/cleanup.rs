//! Removing page images once the PDF exists.

use crate::error::BoxPdfError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Delete `images`, then remove `image_dir` if nothing else is left in it.
///
/// Files that are already gone are ignored. A directory that still holds
/// other files is kept.
pub async fn remove_images(images: &[PathBuf], image_dir: &Path) -> Result<(), BoxPdfError> {
    for path in images {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BoxPdfError::io(path, e)),
        }
    }

    match tokio::fs::remove_dir(image_dir).await {
        Ok(()) => info!("Removed {}", image_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Kept {}: {}", image_dir.display(), e),
    }
    Ok(())
}
