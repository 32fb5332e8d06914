use clap::Parser;
use std::path::PathBuf;

use crate::paths;

#[derive(Parser, Debug)]
#[command(name = "firstboot")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision this machine once per instance: hostname, users, files, commands", long_about = None)]
pub struct Cli {
    /// Configuration document (YAML, or JSON/TOML by extension)
    #[arg(short, long, env = "FIRSTBOOT_CONFIG", default_value = paths::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory holding one marker file per provisioned instance id
    #[arg(long, env = "FIRSTBOOT_MARKER_DIR", default_value = paths::DEFAULT_MARKER_DIR)]
    pub marker_dir: PathBuf,

    /// Persisted hostname record rewritten before the live hostname changes
    #[arg(long, env = "FIRSTBOOT_HOSTNAME_FILE", default_value = paths::DEFAULT_HOSTNAME_FILE)]
    pub hostname_file: PathBuf,

    /// Kill any spawned command that runs longer than this many seconds
    #[arg(long, env = "FIRSTBOOT_COMMAND_TIMEOUT", value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Show what would be applied without changing the machine
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
