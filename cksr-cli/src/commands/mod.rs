mod config;
mod init;
mod inspect;
mod refresh;
mod rollback;
mod update;

pub use config::{run_new_config, show_version};
pub use init::run_init;
pub use inspect::{inspect_report, run_inspect};
pub use refresh::run_refresh;
pub use rollback::run_rollback;
pub use update::run_update;
