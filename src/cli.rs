use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// The command line interface for pumpfs.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a configuration file
    pub config: Option<PathBuf>,

    /// Serial device to read from, overriding the configuration
    #[arg(long)]
    pub device: Option<String>,

    /// How many readings to retain, overriding the configuration
    #[arg(long)]
    pub keep: Option<usize>,

    /// Also write daily-rolling log files into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand)]
pub enum Commands {
    /// Show an example of a configuration file's contents.
    ConfigExample,
}
