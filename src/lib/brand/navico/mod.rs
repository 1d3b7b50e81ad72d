use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use crate::config::{EmulatorConfig, to_duration};
use crate::network::Transport;
use crate::radar::RadarError;
use crate::radar::sweep::SweepBuffer;
use crate::scheduler::Scheduler;

mod data;
mod report;

pub use data::{Quantizer, Spoke, SpokeSender, encode_frame, range_to_native};
pub use report::{IdentityReport, ReportSender, SettingsReport, StatusReport};

pub const NAVICO_SPOKES: usize = 2048;

// Length of a spoke in pixels. Every pixel is 4 bits (one nibble.)
pub const NAVICO_SPOKE_LEN: usize = 1024;

pub const SPOKES_PER_FRAME: usize = 32;
const BITS_PER_BYTE: usize = 8;
const BITS_PER_NIBBLE: usize = 4;
const NAVICO_PIXELS_PER_BYTE: usize = BITS_PER_BYTE / BITS_PER_NIBBLE;
pub const RADAR_LINE_DATA_LENGTH: usize = NAVICO_SPOKE_LEN / NAVICO_PIXELS_PER_BYTE;

// Where a BR24 sends its reports and its spoke data
pub const NAVICO_REPORT_ADDRESS: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(236, 6, 7, 9), 6679);
pub const NAVICO_DATA_ADDRESS: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(236, 6, 7, 8), 6678);

pub const BR24_SERIAL_NO: &str = "BR24SIM000001";

/// Radar power state as carried in the status report
#[derive(
    Serialize, Deserialize, clap::ValueEnum, strum::Display, Clone, Copy, Debug, Default, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RadarStatus {
    Off = 0,
    Standby = 1,
    #[default]
    Transmit = 2,
    Preparing = 5,
}

#[derive(Serialize, Deserialize, strum::Display, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    Custom = 0,
    Harbor = 1,
    #[default]
    Offshore = 2,
    Bird = 4,
    Weather = 5,
}

#[derive(Serialize, Deserialize, strum::Display, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SeaAuto {
    Off = 0,
    Harbor = 1,
    #[default]
    Offshore = 2,
}

///
/// Builds the scheduler for one emulated BR24: the three reports on the report
/// channel and the spoke frames on the data channel, in that order.
///
pub fn new(
    config: &EmulatorConfig,
    transport: Arc<dyn Transport>,
    sweep: SweepBuffer,
) -> Result<Scheduler, RadarError> {
    config.validate()?;

    let status = StatusReport {
        status: config.status,
    };
    let identity = IdentityReport::new(&config.serial_no, config.radar_addr)?;

    let report_addr = config.report_address;
    let data_addr = config.data_address;
    log::info!(
        "Emulating {} at {}: reports to {}, spokes to {}",
        config.serial_no,
        config.radar_addr,
        report_addr,
        data_addr
    );

    let mut scheduler = Scheduler::new();
    scheduler.register(
        Box::new(ReportSender::new(
            "status report",
            status.encode()?,
            report_addr,
            transport.clone(),
        )),
        to_duration("interval_statusReport", config.intervals.status_report)?,
    )?;
    scheduler.register(
        Box::new(ReportSender::new(
            "settings report",
            config.settings.encode()?,
            report_addr,
            transport.clone(),
        )),
        to_duration("interval_settingsReport", config.intervals.settings_report)?,
    )?;
    scheduler.register(
        Box::new(ReportSender::new(
            "identity report",
            identity.encode()?,
            report_addr,
            transport.clone(),
        )),
        to_duration("interval_identityReport", config.intervals.identity_report)?,
    )?;
    scheduler.register(
        Box::new(SpokeSender::new(
            sweep,
            config.spokes_per_batch,
            config.range_meters,
            data_addr,
            transport,
        )),
        to_duration("interval_spokeBatch", config.intervals.spoke_batch)?,
    )?;

    Ok(scheduler)
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::radar::pattern::border_pattern;

    /// Keeps every datagram instead of sending it
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub sent: Mutex<Vec<(Vec<u8>, SocketAddrV4)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_to(&self, message: &[u8], addr: &SocketAddrV4) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::NetworkUnreachable, "down"));
            }
            self.sent.lock().unwrap().push((message.to_vec(), *addr));
            Ok(message.len())
        }
    }

    fn sweep() -> SweepBuffer {
        SweepBuffer::new(border_pattern(NAVICO_SPOKES, NAVICO_SPOKE_LEN), NAVICO_SPOKE_LEN)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_sends_every_packet_once() {
        let transport = Arc::new(RecordingTransport::default());
        let mut scheduler = new(&EmulatorConfig::default(), transport.clone(), sweep()).unwrap();
        assert_eq!(
            scheduler.task_names().collect::<Vec<_>>(),
            vec!["status report", "settings report", "identity report", "spokes"]
        );

        scheduler.tick().await.unwrap();

        let sent = transport.sent.lock().unwrap();
        let summary: Vec<(usize, [u8; 2], SocketAddrV4)> = sent
            .iter()
            .map(|(bytes, addr)| (bytes.len(), [bytes[0], bytes[1]], *addr))
            .collect();
        assert_eq!(
            summary,
            vec![
                (18, [0x01, 0xc4], NAVICO_REPORT_ADDRESS),
                (99, [0x02, 0xc4], NAVICO_REPORT_ADDRESS),
                (208, [0x01, 0xb2], NAVICO_REPORT_ADDRESS),
                (17160, [0x00, 0x00], NAVICO_DATA_ADDRESS),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spokes_are_sent_more_often_than_reports() {
        let transport = Arc::new(RecordingTransport::default());
        let mut scheduler = new(&EmulatorConfig::default(), transport.clone(), sweep()).unwrap();

        let end = tokio::time::Instant::now() + Duration::from_secs(1);
        while tokio::time::Instant::now() < end {
            let next_wake = scheduler.tick().await.unwrap();
            tokio::time::sleep_until(next_wake).await;
        }

        let sent = transport.sent.lock().unwrap();
        let to = |addr| sent.iter().filter(|(_, a)| *a == addr).count();
        assert_eq!(to(NAVICO_REPORT_ADDRESS), 30);
        assert!((66..=68).contains(&to(NAVICO_DATA_ADDRESS)));
    }

    #[tokio::test(start_paused = true)]
    async fn send_failures_do_not_stop_the_emulator() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let mut scheduler = new(&EmulatorConfig::default(), transport, sweep()).unwrap();

        for _ in 0..5 {
            let next_wake = scheduler.tick().await.unwrap();
            tokio::time::sleep_until(next_wake).await;
        }
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let mut config = EmulatorConfig::default();
        config.intervals.spoke_batch = 0.;
        let transport = Arc::new(RecordingTransport::default());
        assert!(matches!(
            new(&config, transport, sweep()),
            Err(RadarError::InvalidInterval(name, _)) if name == "interval_spokeBatch"
        ));
    }
}
