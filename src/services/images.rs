//! Content-addressed storage for uploaded project images.
//!
//! Files are written to `{root}/projects/{first_hex}{second_hex}/{sha256}.{ext}`
//! and identical uploads share a file.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::forms::ProjectImageForm;
use crate::{Error, Result};

/// Writes project images below a root directory.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
    max_size: usize,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    /// Largest accepted upload in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Absolute location of a stored image name.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Store an image and return its name relative to the root.
    pub async fn store(&self, image: &ProjectImageForm) -> Result<String> {
        let hash = hex::encode(Sha256::digest(&image.data));
        let extension = extension_for(&image.content_type, &image.filename);
        let name = format!("projects/{}/{}.{}", &hash[..2], hash, extension);

        let full_path = self.path_of(&name);
        if tokio::fs::try_exists(&full_path).await.unwrap_or(false) {
            debug!(%name, "Image already stored");
            return Ok(name);
        }

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(format!("Failed to create directories: {}", e)))?;
        }

        tokio::fs::write(&full_path, &image.data)
            .await
            .map_err(|e| Error::Internal(format!("Failed to write image: {}", e)))?;

        debug!(%name, size = image.data.len(), "Image stored");

        Ok(name)
    }
}

fn extension_for(content_type: &str, filename: &str) -> String {
    match content_type {
        "image/png" => "png".to_string(),
        "image/jpeg" => "jpg".to_string(),
        "image/gif" => "gif".to_string(),
        _ => std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "bin".to_string()),
    }
}
