pub mod issues;
pub mod profile;
pub mod upload;

pub use issues::IssueAccessor;
pub use profile::ProfileReader;
pub use upload::{FileUpload, FileUploader};
