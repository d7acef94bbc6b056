pub mod blob_store;
pub mod repository;
pub mod version_store;

pub use blob_store::{BlobStore, MaterializeStats};
