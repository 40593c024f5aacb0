// Upload validation. Runs before any blob is written.

use crate::constants::{MAX_THUMBNAIL_SIZE_BYTES, MAX_VIDEO_SIZE_BYTES, THUMBNAIL_MIME_PREFIX};
use crate::error::{Result, VidShelfError};

use super::MediaFile;

pub fn validate_video(file: &MediaFile) -> Result<()> {
    validate_video_size(file.size())
}

/// Size gate on its own, for input whose length is known before it is read.
pub fn validate_video_size(size: u64) -> Result<()> {
    if size > MAX_VIDEO_SIZE_BYTES {
        return Err(VidShelfError::OversizeVideo {
            size,
            max: MAX_VIDEO_SIZE_BYTES,
        });
    }
    Ok(())
}

pub fn validate_thumbnail(file: &MediaFile) -> Result<()> {
    if !file.mime_type.starts_with(THUMBNAIL_MIME_PREFIX) {
        return Err(VidShelfError::InvalidThumbnail(format!(
            "{} is not an image ({})",
            file.file_name, file.mime_type
        )));
    }
    validate_thumbnail_size(file.size())
}

pub fn validate_thumbnail_size(size: u64) -> Result<()> {
    if size > MAX_THUMBNAIL_SIZE_BYTES {
        return Err(VidShelfError::InvalidThumbnail(format!(
            "image is too large ({:.2}MB). The maximum is 2MB.",
            size as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}
