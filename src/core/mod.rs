pub mod constants;
pub mod switcher;
pub mod version;

pub use switcher::{ActiveVersionSwitch, LinkStatus};
pub use version::{MinorVersion, Version};
