use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    classify::ClassifyArgs, deps::DepsArgs, resolve::ResolveArgs, schema::SchemaArgs,
    select::SelectArgs,
};
use crate::config::{CACHE_MAX_ENTRIES_ENV_VAR, CACHE_TTL_ENV_VAR};

#[derive(Debug, Parser)]
#[command(
    name = "querycompat",
    version,
    about = "Version-aware SQL selection and table dependency checks for cluster dashboards"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "SECS", env = CACHE_TTL_ENV_VAR)]
    pub cache_ttl_secs: Option<u64>,

    #[arg(long, global = true, value_name = "COUNT", env = CACHE_MAX_ENTRIES_ENV_VAR)]
    pub cache_max_entries: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Resolve(ResolveArgs),
    Select(SelectArgs),
    Deps(DepsArgs),
    Classify(ClassifyArgs),
    Schema(SchemaArgs),
}
