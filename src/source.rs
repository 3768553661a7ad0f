//! Loads screenshots from disk as RGB rasters.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("image not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Opens `path` and converts it to RGB8, dropping any alpha channel.
pub fn load_image(path: &Path) -> Result<RgbImage, SourceError> {
    if !path.is_file() {
        return Err(SourceError::FileNotFound(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    Ok(img.to_rgb8())
}

/// Loads a before/after pair.
pub fn load_pair(before: &Path, after: &Path) -> Result<(RgbImage, RgbImage), SourceError> {
    Ok((load_image(before)?, load_image(after)?))
}
