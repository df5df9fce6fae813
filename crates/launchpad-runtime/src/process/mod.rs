//! External process management.
//!
//! - [`ExternalProcess`]: start / wait / kill / terminate on one OS process
//! - [`exec`] and [`exec_detached`]: one-shot commands with optional capture
//! - [`SystemProcessRunner`]: the `ProcessRunner` port over real processes

mod exec;
mod external;
mod runner;
mod shutdown;

pub use exec::{ExecOptions, ExecOutput, exec, exec_detached};
pub use external::ExternalProcess;
pub use runner::SystemProcessRunner;
pub use shutdown::{DEFAULT_GRACE, shutdown_child};
