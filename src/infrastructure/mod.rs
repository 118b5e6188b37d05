pub mod config;
pub mod installer;
pub mod remote;
pub mod shell;

pub use config::{Config, SourceProvider};
pub use installer::StoreLock;
pub use remote::{CatalogClient, CatalogSource, Deadline, HttpClient, Platform};
