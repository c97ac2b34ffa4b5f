pub mod upload;

pub use upload::{MAX_COVER_BYTES, UploadError, UploadService, cover_url};
