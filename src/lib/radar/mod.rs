use thiserror::Error;

pub mod pattern;
pub mod sweep;

// A "native to radar" bearing, usually [0..2048] or [0..4096] or [0..8192]
pub type SpokeBearing = u16;

pub const BYTE_LOOKUP_LENGTH: usize = (u8::MAX as usize) + 1;

#[derive(Error, Debug)]
pub enum RadarError {
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
    #[error("Cannot encode packet: {0}")]
    Encode(#[from] bincode::Error),
    #[error("Spoke has {actual} samples, expected {expected}")]
    SpokeLength { expected: usize, actual: usize },
    #[error("Sweep of {spokes} x {spoke_len} samples is not usable, spokes must be {expected} wide")]
    SweepShape {
        spokes: usize,
        spoke_len: usize,
        expected: usize,
    },
    #[error("Interval for '{0}' must be a positive number of seconds, not {1}")]
    InvalidInterval(String, f64),
    #[error("Serial number '{0}' must be at most 16 ASCII characters")]
    InvalidSerial(String),
    #[error("Interface '{0}' is not available")]
    InterfaceNotFound(String),
    #[error("Interface '{0}' has no valid IPv4 address")]
    InterfaceNoV4(String),
    #[error("Cannot detect Ethernet devices")]
    EnumerationFailed,
    #[error("Cannot parse JSON '{0}'")]
    ParseJson(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
