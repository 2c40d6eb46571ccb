use clap::{Parser, Subcommand};

const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "provision-coder")]
#[command(about = "Provision coding API (fastText + label table)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the spreadsheets and every model artifact, report counts, exit.
    Check(CheckArgs),
    /// Serve the prediction API (everything loads before the listener binds).
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Service data directory (source spreadsheets and model artifacts).
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Service data directory (source spreadsheets and model artifacts).
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}
