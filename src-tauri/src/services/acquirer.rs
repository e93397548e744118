use crate::error::AppError;
use crate::models::capture_types::{
    AcquiredImage, AcquisitionResult, CaptureConstraints, CaptureSource,
};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;

const STAGED_FILE_NAME: &str = "leaf-upload.jpg";

/// One acquisition attempt: open the host picker, resolve exactly once
/// to cancellation, a picker error, or a normalized image.
#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    async fn acquire(
        &self,
        source: CaptureSource,
        constraints: &CaptureConstraints,
    ) -> AcquisitionResult;
}

/// Desktop acquirer backed by the native file dialog. Desktop hosts have
/// no capture UI, so both sources route through the same picker; the
/// dialog's callback is bridged to a single-resolution await via a
/// oneshot channel.
pub struct DialogAcquirer {
    app: AppHandle,
    stage_dir: PathBuf,
}

impl DialogAcquirer {
    pub fn new(app: AppHandle, stage_dir: PathBuf) -> Self {
        DialogAcquirer { app, stage_dir }
    }
}

#[async_trait]
impl ImageAcquirer for DialogAcquirer {
    async fn acquire(
        &self,
        source: CaptureSource,
        constraints: &CaptureConstraints,
    ) -> AcquisitionResult {
        let _ = source;
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.app
            .dialog()
            .file()
            .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
            .pick_file(move |picked| {
                let _ = tx.send(picked);
            });

        let picked = match rx.await {
            Ok(p) => p,
            Err(_) => {
                return AcquisitionResult::Failed(
                    "picker closed without reporting a result".to_string(),
                )
            }
        };

        // No selected asset means the user backed out, not an error.
        let file = match picked {
            Some(f) => f,
            None => return AcquisitionResult::Cancelled,
        };

        let path = match file.as_path() {
            Some(p) => p.to_path_buf(),
            None => {
                return AcquisitionResult::Failed(format!(
                    "unsupported picker location: {}",
                    file
                ))
            }
        };

        match stage_for_upload(&path, &self.stage_dir, constraints).await {
            Ok(image) => AcquisitionResult::Acquired(image),
            Err(e) => AcquisitionResult::Failed(e.message),
        }
    }
}

/// Normalize a picked file to the upload constraints: decode, resize to
/// the constraint box, re-encode JPEG at the constraint quality, and
/// write the copy into the staging directory. Decode and encode run on
/// a blocking thread.
pub(crate) async fn stage_for_upload(
    path: &Path,
    stage_dir: &Path,
    constraints: &CaptureConstraints,
) -> Result<AcquiredImage, AppError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo.jpg")
        .to_string();

    let src = path.to_path_buf();
    let (width, height, quality) = (constraints.width, constraints.height, constraints.quality);
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let img = ImageReader::open(&src)
            .map_err(|e| AppError {
                message: format!("Failed to open image {}: {}", src.display(), e),
            })?
            .with_guessed_format()?
            .decode()
            .map_err(|e| AppError {
                message: format!("Failed to decode image {}: {}", src.display(), e),
            })?;

        let img = img.resize_exact(width, height, FilterType::Triangle);

        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        img.write_with_encoder(encoder).map_err(|e| AppError {
            message: format!("Failed to encode upload copy: {}", e),
        })?;
        Ok(buffer.into_inner())
    })
    .await
    .map_err(|e| AppError {
        message: format!("Staging task failed: {}", e),
    })??;

    tokio::fs::create_dir_all(stage_dir).await?;
    let staged = stage_dir.join(STAGED_FILE_NAME);
    tokio::fs::write(&staged, &bytes).await?;

    Ok(AcquiredImage {
        uri: platform_uri(&staged),
        name,
        mime_type: "image/jpeg".to_string(),
    })
}

/// iOS file APIs want an explicit scheme prefix; every other host takes
/// the bare path unchanged.
pub(crate) fn platform_uri(path: &Path) -> String {
    let raw = path.to_string_lossy().to_string();
    if cfg!(target_os = "ios") && !raw.starts_with("file://") {
        format!("file://{}", raw)
    } else {
        raw
    }
}

/// Inverse of `platform_uri`: strip the scheme so the file can be read
/// through the filesystem.
pub(crate) fn local_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}
