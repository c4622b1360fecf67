use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::web::{error::AppError, response::ApiResponse, AppState};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Multipart framing on top of the file itself.
const BODY_LIMIT: usize = MAX_FILE_SIZE + 2 * 1024 * 1024;
const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];
pub const MAX_DIMENSION: u32 = 1920;
const JPEG_QUALITY: u8 = 85;

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads", post(upload_image))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn check_extension(filename: &str) -> Result<(), AppError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(AppError::InvalidInput(format!(
            "지원하지 않는 파일 형식입니다. ({})",
            SUPPORTED_FORMATS.join(", ")
        )));
    }
    Ok(())
}

/// Shrinks the image to fit a `MAX_DIMENSION` box, keeping its aspect ratio.
pub fn fit_within(img: DynamicImage) -> DynamicImage {
    if img.width() <= MAX_DIMENSION && img.height() <= MAX_DIMENSION {
        return img;
    }
    img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
}

/// Decodes, downscales and re-encodes as JPEG.
pub fn process_image(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::InvalidInput(format!("이미지 파일을 읽을 수 없습니다: {e}")))?;
    let rgb = fit_within(img).to_rgb8();

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode image: {e}")))?;
    Ok(buffer)
}

async fn upload_image(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, ApiResponse<UploadResponse>), AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("잘못된 업로드 요청입니다: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("파일을 읽을 수 없습니다: {e}")))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::InvalidInput("업로드할 파일이 없습니다.".to_string()))?;
    if data.is_empty() {
        return Err(AppError::InvalidInput("빈 파일입니다.".to_string()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::InvalidInput(
            "파일 크기는 10MB 이하여야 합니다.".to_string(),
        ));
    }
    check_extension(&filename)?;

    let jpeg = tokio::task::spawn_blocking(move || process_image(&data))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Image task failed: {e}")))??;

    let stored_name = format!("{}.jpg", calculate_hash(&jpeg));
    let dir = PathBuf::from(&app_state.config.upload_dir);
    let path = dir.join(&stored_name);
    // Same content hashes to the same name; an existing file is reused.
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to create upload dir: {e}")))?;
        tokio::fs::write(&path, &jpeg)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to store upload: {e}")))?;
    }
    info!(file = %stored_name, bytes = jpeg.len(), "Image uploaded.");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(UploadResponse {
            url: format!("/uploads/{stored_name}"),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_extension_whitelist() {
        assert!(check_extension("robot.PNG").is_ok());
        assert!(check_extension("robot.webp").is_ok());
        assert!(check_extension("robot.gif").is_err());
        assert!(check_extension("robot").is_err());
    }

    #[test]
    fn test_large_image_is_downscaled_to_jpeg() {
        let jpeg = process_image(&png(3840, 1080)).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decoded.width(), 1920);
        assert_eq!(decoded.height(), 540);
    }

    #[test]
    fn test_small_image_keeps_size_and_garbage_is_rejected() {
        let decoded = image::load_from_memory(&process_image(&png(64, 32)).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
        assert!(matches!(process_image(b"not an image"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = calculate_hash(b"abc");
        assert_eq!(hash.len(), 64);
        assert!(hash.starts_with("ba7816bf"));
    }
}
