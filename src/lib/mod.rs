extern crate tokio;

use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_graceful_shutdown::SubsystemHandle;

use brand::navico::{self, NAVICO_SPOKE_LEN, NAVICO_SPOKES, RadarStatus};
use config::EmulatorConfig;
use network::MulticastTransport;
use radar::RadarError;
use radar::pattern::border_pattern;
use radar::sweep::SweepBuffer;

pub mod brand;
pub mod config;
pub mod network;
pub mod radar;
pub mod scheduler;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Emulates a Navico BR24 radar on the local network")]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Configuration file, by default `emulator.json` in the user's config directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Send from the IPv4 address of this interface
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Address reported as the radar's own address; also the sending NIC
    #[arg(short, long)]
    pub address: Option<Ipv4Addr>,

    /// Multicast time-to-live
    #[arg(long)]
    pub ttl: Option<u32>,

    /// Serial number in the identity report
    #[arg(short, long)]
    pub serial: Option<String>,

    /// Range in meters, for the spoke headers and the settings report
    #[arg(short, long)]
    pub range: Option<u32>,

    /// Status in the status report
    #[arg(long, value_enum)]
    pub status: Option<RadarStatus>,
}

///
/// Runs one emulated radar until shutdown is requested or a task fails.
///
pub async fn run(subsys: SubsystemHandle, args: Cli) -> Result<(), RadarError> {
    let config = EmulatorConfig::load(&args)?;

    let transport = Arc::new(MulticastTransport::new(
        &config.radar_addr,
        config.multicast_ttl,
    )?);
    let sweep = SweepBuffer::new(border_pattern(NAVICO_SPOKES, NAVICO_SPOKE_LEN), NAVICO_SPOKE_LEN)?;
    let mut scheduler = navico::new(&config, transport, sweep)?;

    tokio::select! {
        _ = subsys.on_shutdown_requested() => {
            log::info!("{}: shutdown", PACKAGE);
            Ok(())
        },
        r = scheduler.run() => {
            if let Err(e) = &r {
                log::error!("{}: {}", PACKAGE, e);
            }
            r
        }
    }
}
