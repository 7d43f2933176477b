use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use image::codecs::jpeg::JpegEncoder;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];
const MAX_DIMENSION: u32 = 800;
const JPEG_QUALITY: u8 = 85;

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn products_dir(upload_dir: &Path) -> PathBuf {
    upload_dir.join("products")
}

pub fn is_allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode, shrink to fit 800x800 and re-encode as JPEG.
pub fn compress_image(data: &[u8]) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::BadRequest(format!("Invalid image: {e}")))?;

    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.thumbnail(MAX_DIMENSION, MAX_DIMENSION)
    } else {
        img
    };

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("image compression failed: {e}")))?;
    }
    Ok(buffer)
}

/// Store a product image and return the URL path it is served from.
pub async fn store_product_image(upload_dir: &Path, upload: ImageUpload) -> AppResult<String> {
    if !is_allowed_file(&upload.file_name) {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type: {}",
            upload.file_name
        )));
    }

    let ImageUpload { file_name, bytes } = upload;
    let encoded = tokio::task::spawn_blocking(move || compress_image(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("image task failed: {e}")))??;

    let dir = products_dir(upload_dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let stored_name = format!("{}.jpg", Uuid::new_v4());
    tokio::fs::write(dir.join(&stored_name), &encoded)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(original = %file_name, stored = %stored_name, bytes = encoded.len(), "product image stored");
    Ok(format!("{PUBLIC_PREFIX}/products/{stored_name}"))
}
