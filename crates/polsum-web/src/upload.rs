use axum::extract::Multipart;

use polsum_core::MediaType;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// An uploaded file with its data and detected media type.
pub struct UploadedFile {
    pub filename: String,
    pub media_type: MediaType,
    pub data: Vec<u8>,
}

/// Parse a multipart form upload into an [`UploadedFile`].
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadedFile, String> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" | "document" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let declared = field.content_type().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                let media_type = detect_media_type(&filename, declared.as_deref(), &data)?;

                file = Some(UploadedFile {
                    filename,
                    media_type,
                    data,
                });
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    file.ok_or_else(|| "No file uploaded".to_string())
}

/// Detect the media type from extension, declared content type, and
/// magic bytes. Anything outside the PDF/DOCX allow-list is a client
/// error, rejected before a job is created.
pub fn detect_media_type(
    filename: &str,
    declared: Option<&str>,
    data: &[u8],
) -> Result<MediaType, String> {
    let lower = filename.to_lowercase();

    if lower.ends_with(".pdf") || declared == Some("application/pdf") {
        if !data.starts_with(b"%PDF-") {
            return Err("File is named as a PDF but doesn't appear to be one".to_string());
        }
        return Ok(MediaType::Pdf);
    }

    if lower.ends_with(".docx") || declared == Some(DOCX_MIME) {
        // DOCX is a ZIP container
        if !data.starts_with(b"PK") {
            return Err("File is named as a DOCX but doesn't appear to be one".to_string());
        }
        return Ok(MediaType::Docx);
    }

    // Try detecting by magic bytes alone
    if data.starts_with(b"%PDF-") {
        return Ok(MediaType::Pdf);
    }

    Err("Unsupported file type. Please upload a PDF or DOCX policy document.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_by_extension_and_magic() {
        let t = detect_media_type("policy.pdf", None, b"%PDF-1.7 ...").unwrap();
        assert_eq!(t, MediaType::Pdf);
    }

    #[test]
    fn pdf_extension_with_wrong_magic_is_rejected() {
        assert!(detect_media_type("policy.pdf", None, b"GIF89a").is_err());
    }

    #[test]
    fn docx_by_content_type() {
        let t = detect_media_type("upload", Some(DOCX_MIME), b"PK\x03\x04rest").unwrap();
        assert_eq!(t, MediaType::Docx);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = detect_media_type("notes.txt", Some("text/plain"), b"hello").unwrap_err();
        assert!(err.contains("Unsupported file type"));
    }

    #[test]
    fn pdf_magic_without_extension_is_accepted() {
        let t = detect_media_type("upload.bin", None, b"%PDF-1.4").unwrap();
        assert_eq!(t, MediaType::Pdf);
    }
}
