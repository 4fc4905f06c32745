//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod analyze;
pub mod history;
pub mod inspect;

pub use analyze::{run as analyze_run, AnalyzeConfig};
pub use inspect::{detect as detect_run, participants as participants_run};
