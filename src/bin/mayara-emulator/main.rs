use clap::Parser;
use env_logger::Env;
use log::info;
use miette::Result;
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use mayara_emulator::{Cli, PACKAGE, VERSION};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = args.verbose.log_level_filter();
    env_logger::Builder::from_env(Env::default())
        .filter_level(log_level)
        .init();

    info!("{} {} loglevel {}", PACKAGE, VERSION, log_level);

    Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("Emulator", |a| {
            mayara_emulator::run(a, args)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(5000))
    .await
    .map_err(Into::into)
}
