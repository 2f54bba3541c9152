use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;

/// 10 MB per image payload
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Stores image payloads and hands back stable reference URLs. The rest of
/// the crate treats this as an opaque provider and never inspects image
/// content; swapping in a hosted provider only touches this type.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory served under `/uploads`.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Decode a base64 payload, persist it under a fresh id, and return the
    /// public URL it will be served from.
    pub async fn store(&self, payload: &str) -> Result<String, ApiError> {
        let bytes = B64
            .decode(payload.trim())
            .map_err(|_| ApiError::Validation("image payload is not valid base64".into()))?;

        if bytes.is_empty() {
            return Err(ApiError::Validation("image payload is empty".into()));
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::Validation("image payload too large".into()));
        }

        let id = Uuid::new_v4().to_string();

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            error!("failed to create upload directory {}: {}", self.dir.display(), e);
            ApiError::Internal(e.into())
        })?;

        let path = self.dir.join(&id);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            error!("failed to write image {}: {}", path.display(), e);
            ApiError::Internal(e.into())
        })?;

        Ok(format!("/uploads/{id}"))
    }

    /// Remove a previously stored image by its public URL. Best-effort:
    /// a file that is already gone is not an error.
    pub async fn remove(&self, url: &str) {
        let Some(id) = url.strip_prefix("/uploads/") else {
            return;
        };
        let _ = tokio::fs::remove_file(self.dir.join(id)).await;
    }
}
