use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Bucket storage used to transfer volume captures to the provider
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if it does not exist yet
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// Upload a local file under the given object key
    async fn upload_object(&self, bucket: &str, key: &str, source: &Path) -> Result<()>;

    /// Delete every object under a key prefix
    async fn delete_folder(&self, bucket: &str, prefix: &str) -> Result<()>;
}

/// Object key for a volume's upload within a process folder
pub fn object_key(process_id: &str, file_name: &str) -> String {
    format!("{process_id}/{file_name}")
}
