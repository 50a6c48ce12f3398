use std::path::Path;

use crate::api::errors::ApiError;

/// Extension must be allowed by configuration and agree with the declared MIME type.
pub(crate) fn validate_submission_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "pdf" => mime == "application/pdf",
        "doc" => mime == "application/msword",
        "docx" => {
            mime == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        "txt" => mime == "text/plain",
        "zip" => matches!(mime, "application/zip" | "application/x-zip-compressed"),
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        _ => false,
    }
}
