pub mod catalog;
pub mod deadline;
pub mod download;
pub mod http_client;
pub mod platform;

pub use catalog::{Catalog, CatalogClient, CatalogEntry, CatalogSource, FileDescriptor, FileKind};
pub use deadline::Deadline;
pub use download::{ArchiveFetcher, DownloadProgress};
pub use http_client::{ClientOptions, HttpClient};
pub use platform::Platform;
