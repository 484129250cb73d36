//! Image uploads for covers, avatars and recap photos.

use bc_core::error::{AppError, Result};
use bc_core::policy::{authorize, Action, Resource, Session};
use tracing::info;

use crate::Ports;

/// Files accepted in one request.
pub const MAX_FILES: usize = 10;

/// One multipart file as received.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct UploadService {
    ports: Ports,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(ports: Ports, max_bytes: usize) -> Self {
        Self { ports, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Whether `actor` may upload at all. Callers check this before
    /// reading any request body.
    pub fn admit(&self, actor: &Session) -> Result<()> {
        authorize(actor, Action::Upload, Resource::Club)
    }

    /// Rejects the part unless it declares and actually is an image.
    fn check(&self, part: &UploadPart) -> Result<()> {
        let label = part.file_name.as_deref().unwrap_or("file");

        let declared: mime::Mime = part
            .content_type
            .parse()
            .map_err(|_| AppError::invalid(format!("{label}: unreadable content type")))?;
        if declared.type_() != mime::IMAGE {
            return Err(AppError::invalid(format!("{label}: only images can be uploaded")));
        }
        if part.data.is_empty() {
            return Err(AppError::invalid(format!("{label}: file is empty")));
        }
        if part.data.len() > self.max_bytes {
            return Err(AppError::invalid(format!(
                "{label}: larger than {} bytes",
                self.max_bytes
            )));
        }
        image::guess_format(&part.data)
            .map_err(|_| AppError::invalid(format!("{label}: not a recognizable image")))?;
        Ok(())
    }

    /// Validates every part first, then stores them. Returns public URLs in
    /// upload order.
    pub async fn upload(&self, actor: &Session, parts: Vec<UploadPart>) -> Result<Vec<String>> {
        self.admit(actor)?;
        if parts.is_empty() {
            return Err(AppError::invalid("no files were uploaded"));
        }
        if parts.len() > MAX_FILES {
            return Err(AppError::invalid(format!("at most {MAX_FILES} files per upload")));
        }
        for part in &parts {
            self.check(part)?;
        }

        let mut urls = Vec::with_capacity(parts.len());
        for part in parts {
            let size = part.data.len();
            let media_id = self
                .ports
                .media
                .save_upload(actor.member_id, part.data, &part.content_type)
                .await?;
            info!(member_id = %actor.member_id, %media_id, size, "image uploaded");
            urls.push(self.ports.media.get_url(&media_id).await);
        }
        Ok(urls)
    }
}
