use actix_multipart::{Field, Multipart};
use actix_web::web;
use bc_services::uploads::{UploadPart, MAX_FILES};
use futures_util::TryStreamExt;
use serde_json::json;

use super::{ok, AppState};
use crate::error::{ApiError, ApiResult};
use crate::extract::Caller;

/// Multipart field that carries the images.
const FILES_FIELD: &str = "files";

/// Reads one part, giving up as soon as it exceeds `max_bytes`.
async fn read_part(mut field: Field, max_bytes: usize) -> Result<UploadPart, ApiError> {
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string);
    let content_type = field
        .content_type()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default();

    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| ApiError::invalid(format!("malformed upload: {e}")))?
    {
        if data.len() + chunk.len() > max_bytes {
            let label = file_name.as_deref().unwrap_or("file");
            return Err(ApiError::invalid(format!("{label}: larger than {max_bytes} bytes")));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(UploadPart {
        file_name,
        content_type,
        data,
    })
}

/// `POST /api/upload` → `{"urls": [...]}`
///
/// Permission is checked before the body is read, and at most
/// [`MAX_FILES`] parts of `max_bytes` each are buffered.
pub async fn upload(data: web::Data<AppState>, Caller(me): Caller, mut payload: Multipart) -> ApiResult {
    data.services.uploads.admit(&me)?;
    let max_bytes = data.services.uploads.max_bytes();
    let mut parts = Vec::new();

    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::invalid(format!("malformed upload: {e}")))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        if parts.len() == MAX_FILES {
            return Err(ApiError::invalid(format!("at most {MAX_FILES} files per upload")));
        }
        parts.push(read_part(field, max_bytes).await?);
    }

    let urls = data.services.uploads.upload(&me, parts).await?;
    Ok(ok(json!({ "urls": urls })))
}
