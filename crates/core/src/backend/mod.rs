pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// A flat namespace of named blobs on some medium.
///
/// Every method validates `name` with [`crate::object::validate_name`]
/// before touching the medium. `read` and `delete` report a missing object
/// as [`crate::StoreError::NotFound`].
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> &'static str;
    async fn read(&self, name: &str) -> StoreResult<Bytes>;
    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()>;
    async fn exists(&self, name: &str) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<Vec<String>>;
    async fn delete(&self, name: &str) -> StoreResult<()>;
}
