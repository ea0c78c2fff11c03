//! Command-line definition.

use crate::logging::LogFormat;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `implicit-live` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("implicit-live")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile, run and render implicit scene scripts")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .value_name("URL")
                .global(true)
                .help("Render service base URL"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v, -vv, -vvv)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(LogFormat::NAMES)
                .default_value("pretty")
                .global(true)
                .help("Log output format"),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Submit a script once and print the final state as JSON")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Compile and execute a script without rendering")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("watch")
                .about("Submit a script every time it changes")
                .arg(file_arg())
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .value_name("MS")
                        .value_parser(value_parser!(u64).range(10..))
                        .default_value("250")
                        .help("Poll interval in milliseconds"),
                ),
        )
}

fn file_arg() -> Arg {
    Arg::new("file")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Script to submit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from([
                "implicit-live",
                "run",
                "scene.rhai",
                "-vv",
                "--log-format",
                "json",
                "--endpoint",
                "http://render:8080",
            ])
            .unwrap();

        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(matches.get_one::<String>("log-format").unwrap(), "json");
        assert_eq!(matches.get_one::<String>("endpoint").unwrap(), "http://render:8080");
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(
            sub.get_one::<PathBuf>("file").unwrap(),
            &PathBuf::from("scene.rhai")
        );
    }

    #[test]
    fn watch_interval_has_a_floor() {
        let parsed = build_cli().try_get_matches_from(["implicit-live", "watch", "a", "--interval", "5"]);
        assert!(parsed.is_err());

        let matches = build_cli()
            .try_get_matches_from(["implicit-live", "watch", "a"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(*sub.get_one::<u64>("interval").unwrap(), 250);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let parsed =
            build_cli().try_get_matches_from(["implicit-live", "--log-format", "xml", "check", "a"]);
        assert!(parsed.is_err());
    }
}
