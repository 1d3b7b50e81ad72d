use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use super::{Mode, RadarStatus, SeaAuto};
use crate::brand::send_packet;
use crate::network::{NetworkSocketAddrV4, Transport};
use crate::radar::RadarError;
use crate::scheduler::PeriodicTask;

/*
RADAR REPORTS

The first 2 bytes indicate what the report type is. The emulator sends the
minimum a BR24 client needs to accept the radar and show its image:

01 C4  status,   18 bytes
02 C4  settings, 99 bytes
01 B2  beacon/identity, which tells clients where the radar is
*/

const REPORT_STATUS_LENGTH: usize = 18;
const REPORT_SETTINGS_LENGTH: usize = 99;
const REPORT_IDENTITY_LENGTH: usize = 208;

const SERIAL_NO_LENGTH: usize = 16;
const IDENTITY_ADDRESS_COUNT: usize = 16;

#[derive(Serialize, Deserialize, Debug, Default)]
struct RadarReport1_18 {
    what: u8,      // 0  0x01
    command: u8,   // 1  0xC4
    status: u8,    // 2
    _u03: u8,      // 3
    _u04: u8,      // 4
    _u05: u8,      // 5
    _u06: u16,     // 6..8
    _u08: u16,     // 8..10
    _u10: u16,     // 10..12
    _u12: [u8; 6], // 12..18
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct RadarReport2_99 {
    what: u8,                   // 0  0x02
    command: u8,                // 1  0xC4
    range: u32,                 // 2..6 = range
    _u00: u8,                   // 6
    mode: u8,                   // 7 = mode
    gain_auto: u8,              // 8
    _u01: [u8; 3],              // 9..12
    gain: u8,                   // 12
    sea_auto: u8,               // 13 = sea_auto, 0 = off, 1 = harbor, 2 = offshore
    _u02: u8,                   // 14
    _u03: u16,                  // 15..17
    sea: u32,                   // 17..21
    _u04: u8,                   // 21
    rain: u8,                   // 22
    _u05: u8,                   // 23
    _u06: u32,                  // 24..28
    _u07: u32,                  // 28..32
    _u08: [u8; 2],              // 32..34
    interference_rejection: u8, // 34
    _u09: [u8; 3],              // 35..38
    target_expansion: u8,       // 38
    _u10: [u8; 3],              // 39..42
    target_boost: u8,           // 42
} /* padded with zeros to 99 bytes */

#[derive(Serialize, Deserialize, Debug)]
struct RadarReport1_B2 {
    id: [u8; 2],                       // 01 B2, big endian
    serial_no: [u8; SERIAL_NO_LENGTH], // ASCII serial number, zero padded
    radar_addr: [NetworkSocketAddrV4; IDENTITY_ADDRESS_COUNT], // radar IP and port 0
}

// What follows the addresses in the beacon, sent as is
const IDENTITY_CAPABILITIES: [u8; 94] = [
    0x11, 0x00, 0x00, 0x00, // 4
    0x11, 0x00, 0x00, 0x00, // 8
    0x1f, 0x00, 0x20, 0x01, 0x02, 0x00, 0x10, 0x00, 0x00, 0x00, // 18
    0x11, 0x00, 0x00, 0x00, // 22
    0x10, 0x00, 0x20, 0x01, 0x03, 0x00, 0x10, 0x00, 0x00, 0x00, // 32
    0x11, 0x00, 0x00, 0x00, // 36
    0x12, 0x00, 0x00, 0x00, // 40
    0x10, 0x00, 0x20, 0x02, 0x03, 0x00, 0x10, 0x00, 0x00, 0x00, // 50
    0x11, 0x00, 0x00, 0x00, // 54
    0x12, 0x00, 0x00, 0x00, // 58
    0x12, 0x00, 0x20, 0x01, 0x03, 0x00, 0x10, 0x00, 0x00, 0x00, // 68
    0x11, 0x00, 0x00, 0x00, // 72
    0x12, 0x00, 0x00, 0x00, // 76
    0x12, 0x00, 0x20, 0x02, 0x03, 0x00, 0x10, 0x00, 0x00, 0x00, // 86
    0x11, 0x00, 0x00, 0x00, // 90
    0x12, 0x00, 0x00, 0x00, // 94
];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusReport {
    pub status: RadarStatus,
}

impl StatusReport {
    pub fn encode(&self) -> Result<Vec<u8>, RadarError> {
        let report = RadarReport1_18 {
            what: 0x01,
            command: 0xc4,
            status: self.status as u8,
            ..Default::default()
        };
        let bytes = bincode::serialize(&report)?;
        debug_assert_eq!(bytes.len(), REPORT_STATUS_LENGTH);
        Ok(bytes)
    }
}

/// The user visible settings of the radar, as reported in the 02 C4 report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsReport {
    pub range: u32,
    pub mode: Mode,
    pub gain_auto: bool,
    pub gain: u8,
    pub sea_auto: SeaAuto,
    pub sea: u32,
    pub rain: u8,
    pub interference_rejection: u8,
    pub target_expansion: u8,
    pub target_boost: u8,
}

impl Default for SettingsReport {
    fn default() -> Self {
        SettingsReport {
            range: 1000,
            mode: Mode::Offshore,
            gain_auto: false,
            gain: 0,
            sea_auto: SeaAuto::Offshore,
            sea: 0,
            rain: 0,
            interference_rejection: 0,
            target_expansion: 0,
            target_boost: 0,
        }
    }
}

impl SettingsReport {
    pub fn encode(&self) -> Result<Vec<u8>, RadarError> {
        let report = RadarReport2_99 {
            what: 0x02,
            command: 0xc4,
            range: self.range,
            mode: self.mode as u8,
            gain_auto: self.gain_auto as u8,
            gain: self.gain,
            sea_auto: self.sea_auto as u8,
            sea: self.sea,
            rain: self.rain,
            interference_rejection: self.interference_rejection,
            target_expansion: self.target_expansion,
            target_boost: self.target_boost,
            ..Default::default()
        };
        let mut bytes = bincode::serialize(&report)?;
        bytes.resize(REPORT_SETTINGS_LENGTH, 0);
        Ok(bytes)
    }
}

/// The beacon that announces the radar: its serial number and address
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityReport {
    serial_no: [u8; SERIAL_NO_LENGTH],
    radar_addr: Ipv4Addr,
}

impl IdentityReport {
    pub fn new(serial_no: &str, radar_addr: Ipv4Addr) -> Result<Self, RadarError> {
        if !serial_no.is_ascii() || serial_no.len() > SERIAL_NO_LENGTH {
            return Err(RadarError::InvalidSerial(serial_no.to_owned()));
        }
        let mut serial = [0u8; SERIAL_NO_LENGTH];
        serial[..serial_no.len()].copy_from_slice(serial_no.as_bytes());

        Ok(IdentityReport {
            serial_no: serial,
            radar_addr,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, RadarError> {
        let addr: NetworkSocketAddrV4 = SocketAddrV4::new(self.radar_addr, 0).into();
        let report = RadarReport1_B2 {
            id: 0x01b2u16.to_be_bytes(),
            serial_no: self.serial_no,
            radar_addr: [addr; IDENTITY_ADDRESS_COUNT],
        };
        let mut bytes = bincode::serialize(&report)?;
        bytes.extend_from_slice(&IDENTITY_CAPABILITIES);
        debug_assert_eq!(bytes.len(), REPORT_IDENTITY_LENGTH);
        Ok(bytes)
    }
}

///
/// Sends a report that was encoded up front. None of the reports change while
/// the emulator runs, so they are encoded once.
///
pub struct ReportSender {
    key: String,
    message: Vec<u8>,
    addr: SocketAddrV4,
    transport: Arc<dyn Transport>,
}

impl ReportSender {
    pub fn new(
        key: &str,
        message: Vec<u8>,
        addr: SocketAddrV4,
        transport: Arc<dyn Transport>,
    ) -> Self {
        ReportSender {
            key: key.to_owned(),
            message,
            addr,
            transport,
        }
    }
}

#[async_trait]
impl PeriodicTask for ReportSender {
    fn name(&self) -> &str {
        &self.key
    }

    async fn run(&mut self) -> Result<(), RadarError> {
        log::trace!("{}: {:02X?}", self.key, self.message);
        send_packet(self.transport.as_ref(), &self.key, &self.message, &self.addr).await;
        Ok(())
    }
}
