//! Front end for the implicit-live pipeline.
//!
//! The binary parses arguments with [`cli::build_cli`], installs logging from
//! [`logging`], and dispatches to [`commands`].

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::build_cli;
pub use commands::{check, load_config, read_source, run, watch, CheckOutput, RunOutput, DEFAULT_POLL};
pub use logging::{init_logging, LogConfig, LogFormat};
