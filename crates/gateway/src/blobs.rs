//! Blob-storage capability for breakdown photos.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::GatewayError;

/// Reference to a stored blob.
#[derive(Debug, Clone)]
pub struct BlobRef {
    pub id: String,
    /// Where the blob can be fetched from.
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist a blob and return a stable reference to it.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<BlobRef, GatewayError>;
}

/// Keeps blobs in process memory; URLs use a `memory://` scheme.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<Vec<(BlobRef, Vec<u8>)>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs stored, for tests.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<BlobRef, GatewayError> {
        if bytes.is_empty() {
            return Err(GatewayError::Rejected("empty file".into()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let blob = BlobRef {
            url: format!("memory://{id}/{file_name}"),
            id,
        };
        self.blobs.write().await.push((blob.clone(), bytes));
        Ok(blob)
    }
}
