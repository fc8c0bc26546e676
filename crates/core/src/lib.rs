pub mod backend;
pub mod error;
pub mod object;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use object::{BatchItemResult, BatchOutcome, BatchSummary, ImageUpload, ObjectInfo};
pub use store::{ImageStore, StoreOptions};
