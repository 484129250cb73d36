//! # bc-storage-local
//! Local filesystem implementation of `MediaStore`.
//! Features: per-member content-addressable storage, directory sharding,
//! and WebP thumbnailing.
//!
//! A media id looks like `<member uuid>/<sha256>.<ext>`; on disk it lives at
//! `<root>/<member uuid>/<first two hex chars>/<sha256>.<ext>`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bc_core::traits::MediaStore;
use image::{DynamicImage, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const THUMBNAIL_EDGE: u32 = 250;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

/// The parts of a media id.
struct MediaKey<'a> {
    owner: &'a str,
    hash: &'a str,
    file_name: &'a str,
}

impl<'a> MediaKey<'a> {
    fn parse(media_id: &'a str) -> Option<Self> {
        let (owner, file_name) = media_id.split_once('/')?;
        let hash = file_name.split('.').next()?;
        if hash.len() < 2 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            owner,
            hash,
            file_name,
        })
    }

    fn shard(&self) -> &'a str {
        &self.hash[0..2]
    }
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    fn sharded_dir(&self, key: &MediaKey<'_>) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(key.owner);
        path.push(key.shard());
        path
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload under its owner using its SHA-256 hash as the file
    /// name, so repeated uploads of the same image by one member dedupe.
    async fn save_upload(&self, owner: Uuid, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let format = image::guess_format(&data).context("upload is not a recognizable image")?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        let hash = hex::encode(Sha256::digest(&data));
        let media_id = format!("{owner}/{hash}.{extension}");
        let key = MediaKey::parse(&media_id).context("generated media id is malformed")?;

        let dir = self.sharded_dir(&key);
        fs::create_dir_all(&dir).await?;

        let target_path = dir.join(key.file_name);
        if fs::try_exists(&target_path).await? {
            debug!(%media_id, "upload already stored");
            return Ok(media_id);
        }

        fs::write(&target_path, &data).await?;
        debug!(%media_id, content_type, bytes = data.len(), "upload stored");

        let thumb_path = dir.join(format!("thumb_{hash}.webp"));
        let thumbnail = tokio::task::spawn_blocking(move || write_thumbnail(data, &thumb_path)).await?;
        if let Err(err) = thumbnail {
            warn!(%media_id, error = %err, "thumbnail generation failed");
        }

        Ok(media_id)
    }

    async fn get_url(&self, media_id: &str) -> String {
        match MediaKey::parse(media_id) {
            Some(key) => format!(
                "{}/{}/{}/{}",
                self.url_prefix,
                key.owner,
                key.shard(),
                key.file_name
            ),
            None => format!("{}/{}", self.url_prefix, media_id),
        }
    }

    async fn get_thumbnail_url(&self, url: &str) -> Option<String> {
        let path = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let (owner, rest) = path.split_once('/')?;
        let (shard, file_name) = rest.split_once('/')?;
        let media_id = format!("{owner}/{file_name}");
        let key = MediaKey::parse(&media_id).filter(|key| key.shard() == shard)?;
        Some(format!(
            "{}/{}/{}/thumb_{}.webp",
            self.url_prefix, key.owner, shard, key.hash
        ))
    }
}

/// Writes a 250px WebP thumbnail of `data` to `thumb_path`.
fn write_thumbnail(data: Vec<u8>, thumb_path: &Path) -> anyhow::Result<()> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgba8());
    thumb.save_with_format(thumb_path, ImageFormat::WebP)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(4, 4, Rgba([200u8, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn temp_store() -> LocalMediaStore {
        let root = std::env::temp_dir().join(format!("bc-storage-{}", Uuid::now_v7()));
        LocalMediaStore::new(root, "/static/uploads/".to_string())
    }

    #[tokio::test]
    async fn test_save_shards_by_owner_and_hash() {
        let store = temp_store();
        let owner = Uuid::now_v7();

        let media_id = store.save_upload(owner, png_bytes(), "image/png").await.unwrap();
        assert!(media_id.starts_with(&format!("{owner}/")));
        assert!(media_id.ends_with(".png"));

        let url = store.get_url(&media_id).await;
        let key = MediaKey::parse(&media_id).unwrap();
        assert_eq!(
            url,
            format!("/static/uploads/{owner}/{}/{}", key.shard(), key.file_name)
        );

        let on_disk = store.root().join(owner.to_string()).join(key.shard()).join(key.file_name);
        assert!(on_disk.exists());
        let thumb_url = store.get_thumbnail_url(&url).await.unwrap();
        assert_eq!(
            thumb_url,
            format!("/static/uploads/{owner}/{}/thumb_{}.webp", key.shard(), key.hash)
        );
        let thumb_on_disk = store
            .root()
            .join(owner.to_string())
            .join(key.shard())
            .join(format!("thumb_{}.webp", key.hash));
        assert!(thumb_on_disk.exists());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_thumbnail_only_for_own_urls() {
        let store = temp_store();
        for url in [
            "https://example.com/cat.png",
            "/static/uploads/cat.png",
            "/static/uploads/owner/zz/zz00.png",
            "/static/uploads/owner/ab/cd01.png",
        ] {
            assert_eq!(store.get_thumbnail_url(url).await, None, "{url}");
        }
        assert_eq!(
            store.get_thumbnail_url("/static/uploads/owner/ab/ab01.png").await.as_deref(),
            Some("/static/uploads/owner/ab/thumb_ab01.webp")
        );
    }

    #[tokio::test]
    async fn test_same_bytes_dedupe() {
        let store = temp_store();
        let owner = Uuid::now_v7();
        let first = store.save_upload(owner, png_bytes(), "image/png").await.unwrap();
        let second = store.save_upload(owner, png_bytes(), "image/png").await.unwrap();
        assert_eq!(first, second);
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_non_image_bytes_rejected() {
        let store = temp_store();
        let saved = store
            .save_upload(Uuid::now_v7(), b"plain text".to_vec(), "image/png")
            .await;
        assert!(saved.is_err());
    }
}
