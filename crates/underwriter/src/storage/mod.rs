pub mod azure;
pub mod blob;
pub mod filesystem;

pub use azure::AzureBlobStore;
pub use blob::{split_blob_path, BlobFetcher, BlobStore};
pub use filesystem::FilesystemBlobStore;
