pub mod cleanup;
pub mod healthcheck;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Removes expired export batches from the blob store and the database")]
pub struct Args {
    /// Probe a running server and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub healthcheck: bool,
    /// Run a single cleanup against the configured environment and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub cleanup: bool,
    #[arg(long)]
    pub check_bind: Option<String>,
}
