use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "poolstrap")]
#[command(version)]
#[command(about = "Provision an encrypted ZFS pool on a whole disk", long_about = None)]
pub struct Cli {
    /// Target disk under /dev/disk/by-id (omit to list candidates)
    pub target: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "POOLSTRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the pool name
    #[arg(long)]
    pub pool: Option<String>,

    /// Install ZFS packages and load the kernel module first
    #[arg(long)]
    pub prepare_host: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
