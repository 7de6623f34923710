use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod commands;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: commands::Commands,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}
