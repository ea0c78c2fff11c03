//! implicit-live - edit a scene script, see it rendered

use anyhow::{Context, Result};
use implicit_live_cli::{
    build_cli, check, commands, init_logging, load_config, read_source, run, LogConfig, LogFormat,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let matches = build_cli().get_matches();

    let format = matches
        .get_one::<String>("log-format")
        .map(|name| name.parse::<LogFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();
    let log_config = LogConfig::from_verbosity(matches.get_count("verbose"))
        .with_format(format)
        .with_ansi(std::io::stderr().is_terminal());
    init_logging(&log_config);

    let config = load_config(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
        matches.get_one::<String>("endpoint").map(String::as_str),
    )?;

    match matches.subcommand() {
        Some(("run", sub)) => {
            let path = file_of(sub)?;
            let output = run(&config, &read_source(path)?).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(exit_code(output.succeeded()))
        }
        Some(("check", sub)) => {
            let path = file_of(sub)?;
            let output = check(&config, &read_source(path)?).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(exit_code(output.succeeded()))
        }
        Some(("watch", sub)) => {
            let interval = sub
                .get_one::<u64>("interval")
                .map_or(commands::DEFAULT_POLL, |ms| Duration::from_millis(*ms));
            commands::watch(&config, file_of(sub)?.to_path_buf(), interval).await?;
            Ok(ExitCode::SUCCESS)
        }
        _ => unreachable!("subcommand_required is set"),
    }
}

fn file_of(matches: &clap::ArgMatches) -> Result<&Path> {
    matches
        .get_one::<PathBuf>("file")
        .map(PathBuf::as_path)
        .context("FILE is required")
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
