pub mod commands;
pub mod handlers;
pub mod output;
pub mod progress;

pub use commands::*;
pub use handlers::*;
pub use output::*;
