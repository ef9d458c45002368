//! Media constraints checked client-side before anything touches the network:
//! image type/size validation, unique object naming, and embed URL vetting.

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::gateway::Gateway;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

static IMAGE_EXTENSIONS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["jpg", "jpeg", "png", "gif", "webp"]);

fn extension_of(file_name: &str) -> Option<String> {
    file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Reject disallowed types and oversized payloads. Runs before any gateway
/// call; a rejected file never produces a partial upload.
pub fn validate_image(file_name: &str, size: usize) -> AppResult<()> {
    let ext = extension_of(file_name)
        .ok_or_else(|| AppError::user("bad_media_type", "file has no extension"))?;
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::user(
            "bad_media_type",
            "Invalid file type. Please upload a JPG, PNG, GIF, or WEBP image.",
        ));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::user("media_too_large", "File is too large. Maximum size is 5MB."));
    }
    Ok(())
}

/// Accept only YouTube and Vimeo embed URLs.
pub fn validate_embed_url(url: &str) -> AppResult<()> {
    let u = url.trim();
    let is_youtube = u.contains("youtube.com/") || u.contains("youtu.be/");
    let is_vimeo = u.contains("vimeo.com/");
    if is_youtube || is_vimeo {
        Ok(())
    } else {
        Err(AppError::user("bad_embed_url", "Please enter a valid YouTube or Vimeo URL."))
    }
}

/// Validate and upload an image, returning its public URL. Object names are
/// random per upload so repeated file names never collide.
pub async fn upload_image(gateway: &dyn Gateway, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
    validate_image(file_name, bytes.len())?;
    let ext = extension_of(file_name).unwrap_or_else(|| "bin".to_string());
    let object_name = format!("uploads/{}.{}", Uuid::new_v4().simple(), ext);
    gateway.upload_media(&object_name, content_type_for(&ext), bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    #[test]
    fn accepts_allowed_types_case_insensitively() {
        validate_image("pikachu.png", 1024).unwrap();
        validate_image("pikachu.JPEG", 1024).unwrap();
        validate_image("pikachu.WebP", MAX_UPLOAD_BYTES).unwrap();
    }

    #[test]
    fn rejects_bad_type_and_oversize() {
        assert!(matches!(validate_image("notes.txt", 10), Err(AppError::UserInput { .. })));
        assert!(matches!(validate_image("noext", 10), Err(AppError::UserInput { .. })));
        let six_mib = 6 * 1024 * 1024;
        assert!(matches!(validate_image("big.png", six_mib), Err(AppError::UserInput { .. })));
    }

    #[test]
    fn embed_urls() {
        validate_embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        validate_embed_url("https://youtu.be/dQw4w9WgXcQ").unwrap();
        validate_embed_url("https://vimeo.com/123456").unwrap();
        assert!(validate_embed_url("https://example.com/video.mp4").is_err());
    }

    #[tokio::test]
    async fn rejected_upload_never_reaches_gateway() {
        let gw = MemoryGateway::new();
        let err = upload_image(&gw, "malware.txt", vec![0u8; 16]).await.unwrap_err();
        assert!(matches!(err, AppError::UserInput { .. }));
        assert_eq!(gw.media_count(), 0);

        let url = upload_image(&gw, "pikachu.png", vec![0u8; 2 * 1024 * 1024]).await.unwrap();
        assert!(url.contains("uploads/"));
        assert_eq!(gw.media_count(), 1);
    }
}
