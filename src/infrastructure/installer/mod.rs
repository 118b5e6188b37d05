pub mod archive;
pub mod lock;
pub mod verify;

pub use archive::extract;
pub use lock::StoreLock;
pub use verify::{sha256_file, verify, verify_or_discard, Verification};
