//! Remote transfer adapter over the `git` command line.

mod git;
mod progress_parser;

pub use git::GitCliTransfer;
pub use progress_parser::{ClonePhase, GitProgressLine, parse_progress_line};
