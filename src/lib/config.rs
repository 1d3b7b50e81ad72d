use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Cli;
use crate::brand::navico::{
    BR24_SERIAL_NO, NAVICO_DATA_ADDRESS, NAVICO_REPORT_ADDRESS, NAVICO_SPOKES, RadarStatus,
    SPOKES_PER_FRAME, SettingsReport,
};
use crate::network::find_interface_address;
use crate::radar::RadarError;

const CONFIG_FILE_NAME: &str = "emulator.json";

pub fn get_project_dirs() -> Option<ProjectDirs> {
    directories::ProjectDirs::from("net", "verruijt", "mayara")
}

/// Seconds between two sends of each kind of packet
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Intervals {
    #[serde(rename = "interval_statusReport")]
    pub status_report: f64,
    #[serde(rename = "interval_settingsReport")]
    pub settings_report: f64,
    #[serde(rename = "interval_identityReport")]
    pub identity_report: f64,
    #[serde(rename = "interval_spokeBatch")]
    pub spoke_batch: f64,
}

impl Default for Intervals {
    fn default() -> Self {
        Intervals {
            status_report: 0.1,
            settings_report: 0.1,
            identity_report: 0.1,
            spoke_batch: 0.015,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmulatorConfig {
    #[serde(flatten)]
    pub intervals: Intervals,

    /// Address of the emulated radar, also the NIC the packets leave from
    pub radar_addr: Ipv4Addr,
    pub multicast_ttl: u32,
    pub report_address: SocketAddrV4,
    pub data_address: SocketAddrV4,

    pub serial_no: String,
    pub status: RadarStatus,
    pub settings: SettingsReport,

    pub range_meters: u32,
    pub spokes_per_batch: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            intervals: Intervals::default(),
            radar_addr: Ipv4Addr::new(192, 168, 1, 142),
            multicast_ttl: 2,
            report_address: NAVICO_REPORT_ADDRESS,
            data_address: NAVICO_DATA_ADDRESS,
            serial_no: BR24_SERIAL_NO.to_owned(),
            status: RadarStatus::Transmit,
            settings: SettingsReport::default(),
            range_meters: 1000,
            spokes_per_batch: SPOKES_PER_FRAME,
        }
    }
}

/// Converts an interval in seconds, refusing anything that would make the
/// scheduler spin or never run the task.
pub fn to_duration(name: &str, seconds: f64) -> Result<Duration, RadarError> {
    if !seconds.is_finite() || seconds <= 0. {
        return Err(RadarError::InvalidInterval(name.to_owned(), seconds));
    }
    Ok(Duration::from_secs_f64(seconds))
}

impl EmulatorConfig {
    pub fn from_file(path: &Path) -> Result<Self, RadarError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config = serde_json::from_reader(reader)
            .map_err(|e| RadarError::ParseJson(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        get_project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    ///
    /// The configuration file named on the command line, or the one in the
    /// user's config directory, or the built-in defaults, with the command
    /// line options applied on top.
    ///
    pub fn load(args: &Cli) -> Result<Self, RadarError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                path => {
                    debug!("no config {:?}; using defaults", path);
                    Self::default()
                }
            },
        };
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Cli) -> Result<(), RadarError> {
        if let Some(interface) = &args.interface {
            self.radar_addr = find_interface_address(interface)?;
            info!("Using interface {} with address {}", interface, self.radar_addr);
        }
        if let Some(addr) = args.address {
            self.radar_addr = addr;
        }
        if let Some(ttl) = args.ttl {
            self.multicast_ttl = ttl;
        }
        if let Some(serial_no) = &args.serial {
            self.serial_no = serial_no.clone();
        }
        if let Some(range) = args.range {
            self.range_meters = range;
            self.settings.range = range;
        }
        if let Some(status) = args.status {
            self.status = status;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RadarError> {
        to_duration("interval_statusReport", self.intervals.status_report)?;
        to_duration("interval_settingsReport", self.intervals.settings_report)?;
        to_duration("interval_identityReport", self.intervals.identity_report)?;
        to_duration("interval_spokeBatch", self.intervals.spoke_batch)?;

        if self.spokes_per_batch == 0 || self.spokes_per_batch > NAVICO_SPOKES {
            return Err(RadarError::Config(format!(
                "spokesPerBatch must be 1..={}, not {}",
                NAVICO_SPOKES, self.spokes_per_batch
            )));
        }
        if !self.serial_no.is_ascii() || self.serial_no.len() > 16 {
            return Err(RadarError::InvalidSerial(self.serial_no.clone()));
        }
        Ok(())
    }
}
