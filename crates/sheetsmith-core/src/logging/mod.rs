//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>` for user-facing progress messages.
//! Low-level protocol traffic goes to the process-wide debug file instead
//! (see [`file_logger`]), which stays silent unless `SHEETSMITH_DEBUG` is set.

mod traits;
mod noop;
mod console;
pub mod file_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::{MemoryLogger, NoOpLogger};
pub use console::ConsoleLogger;

pub use file_logger::{
    log, trace, debug, info, warn, error,
    log_file_path, LogLevel,
};
