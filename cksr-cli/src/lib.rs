pub mod app;
pub mod cli;
pub mod commands;
pub mod project_info;
pub mod utils;

pub use app::{CliApp, EXIT_CONFIG_ERROR, EXIT_RUNTIME_ERROR, exit_code_for, run_standalone};
pub use cli::{Cli, Commands};
pub use commands::*;
pub use project_info::{get_full_version_string, get_version_string};
pub use utils::setup_logging;
