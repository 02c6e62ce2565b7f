//! CLI command handlers, one file per command.

mod analyze;
mod verify;

pub use analyze::{run_analyze, AnalyzeArgs};
pub use verify::{run_verify, VerifyArgs};
