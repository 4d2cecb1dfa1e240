#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use querycompat::classify::ErrorKind;
use querycompat::cli::app::{Cli, Command, RuntimeArgs};
use querycompat::cli::commands;
use querycompat::config::{CacheSettings, RuntimePaths};
use querycompat::models::CommandFailure;
use querycompat::utils::logging;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    logging::init();

    let command_name = command_name(&cli.command);
    tracing::info!(command = command_name, "starting");

    match execute(cli) {
        Ok(()) => {
            tracing::info!(command = command_name, exit_code = EXIT_SUCCESS, "completed");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            tracing::info!(command = command_name, exit_code, "failed");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Resolve(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            let cache_settings = resolve_cache_settings(&cli.runtime)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(commands::resolve::run(
                &args,
                &runtime_paths,
                cache_settings,
            ))
        }
        Command::Select(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::select::run(&args, &runtime_paths)
        }
        Command::Deps(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::deps::run(&args, &runtime_paths)
        }
        Command::Classify(args) => commands::classify::run(&args),
        Command::Schema(args) => commands::schema::run(&args),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    match error
        .downcast_ref::<CommandFailure>()
        .and_then(CommandFailure::kind)
    {
        Some(ErrorKind::ValidationError) => EXIT_VALIDATION_FAILURE,
        _ => EXIT_RUNTIME_FAILURE,
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Resolve(_) => "resolve",
        Command::Select(_) => "select",
        Command::Deps(_) => "deps",
        Command::Classify(_) => "classify",
        Command::Schema(_) => "schema",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    querycompat::config::resolve_runtime_paths(&home_dir, &cwd)
}

fn resolve_cache_settings(args: &RuntimeArgs) -> Result<CacheSettings> {
    CacheSettings::resolve(args.cache_ttl_secs, args.cache_max_entries)
}
