//! Host platform mapping, on-disk cache layout, and subprocess plumbing.

mod exec;
mod host;
mod paths;

pub use exec::{ExecOutput, run_captured};
pub use host::{HostPlatform, HostPlatformError};
pub use paths::ToolPaths;
