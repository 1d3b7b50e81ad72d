use async_trait::async_trait;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::net::SocketAddrV4;
use std::sync::Arc;

use super::{NAVICO_SPOKE_LEN, RADAR_LINE_DATA_LENGTH};
use crate::brand::send_packet;
use crate::network::Transport;
use crate::radar::sweep::SweepBuffer;
use crate::radar::{BYTE_LOOKUP_LENGTH, RadarError, SpokeBearing};
use crate::scheduler::PeriodicTask;

/*
 The radar sends 4 bits per pixel. The mapping from an 8 bit intensity to
 those 4 bits is not linear: every code covers the intensities from its own
 threshold up to the next one.
*/
pub const INTENSITY_THRESHOLDS: [u8; 16] = [
    0x00, 0x32, 0x40, 0x4e, 0x5c, 0x6a, 0x78, 0x86, 0x94, 0xa2, 0xb0, 0xbe, 0xcc, 0xda, 0xe8, 0xf4,
];

// Status byte of a spoke header when the radar is transmitting
const SPOKE_STATUS_VALID: u8 = 0x02;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
struct GenBr24Header {
    header_len: u8,   // 1 bytes
    status: u8,       // 1 bytes
    scan_number: u16, // 2 bytes
    mark: u32,        // 4 bytes
    angle: u16,       // 2 bytes
    heading: u16,     // 2 bytes
    range: u32,       // 4 bytes, in units of 10 m / sqrt(2)
    _u01: u16,        // 2 bytes blank
    _u02: u16,        // 2 bytes
    _u03: u32,        // 4 bytes blank
} /* total size = 24 */

const RADAR_LINE_HEADER_LENGTH: usize = 24;
pub const RADAR_LINE_LENGTH: usize = RADAR_LINE_HEADER_LENGTH + RADAR_LINE_DATA_LENGTH;
pub const FRAME_HEADER_LENGTH: usize = 8;

///
/// Maps 8 bit intensities to the 4 bit codes on the wire.
///
/// `high` holds the code already shifted into the high nibble, so packing a
/// pair of samples is two lookups and an or.
///
#[derive(Clone)]
pub struct Quantizer {
    high: [u8; BYTE_LOOKUP_LENGTH],
    low: [u8; BYTE_LOOKUP_LENGTH],
}

impl Quantizer {
    pub fn new() -> Self {
        let mut high = [0u8; BYTE_LOOKUP_LENGTH];
        let mut low = [0u8; BYTE_LOOKUP_LENGTH];
        for (value, (h, l)) in high.iter_mut().zip(low.iter_mut()).enumerate() {
            // thresholds start at 0, so there is always at least one
            let code = INTENSITY_THRESHOLDS
                .iter()
                .filter(|&&t| t as usize <= value)
                .count()
                - 1;
            *l = code as u8;
            *h = (code as u8) << 4;
        }
        Quantizer { high, low }
    }

    pub fn quantize(&self, value: u8) -> u8 {
        self.low[value as usize]
    }

    /// Packs one spoke of `NAVICO_SPOKE_LEN` samples into half as many bytes,
    /// the even sample in the high nibble.
    pub fn pack<'a, S>(&self, samples: S) -> Result<Vec<u8>, RadarError>
    where
        S: Into<ArrayView1<'a, u8>>,
    {
        let samples = samples.into();
        if samples.len() != NAVICO_SPOKE_LEN {
            return Err(RadarError::SpokeLength {
                expected: NAVICO_SPOKE_LEN,
                actual: samples.len(),
            });
        }

        let mut packed = Vec::with_capacity(RADAR_LINE_DATA_LENGTH);
        for pair in samples.exact_chunks(2) {
            packed.push(self.high[pair[0] as usize] | self.low[pair[1] as usize]);
        }
        Ok(packed)
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a range in meters to the BR24 native unit of 10 m / sqrt(2)
pub fn range_to_native(range_meters: u32) -> u32 {
    (range_meters as f64 * SQRT_2 / 10.).round() as u32
}

/// One line of the sweep, ready to be encoded
#[derive(Debug, Clone)]
pub struct Spoke<'a> {
    pub angle: SpokeBearing,
    pub heading: u16,
    pub range_meters: u32,
    pub scan_number: u16,
    pub data: ArrayView1<'a, u8>,
}

impl<'a> Spoke<'a> {
    /// The angle on the wire counts in half spokes, wrapped at the sweep size
    pub fn new(index: usize, spokes: usize, range_meters: u32, data: ArrayView1<'a, u8>) -> Self {
        Spoke {
            angle: ((2 * index) % spokes) as SpokeBearing,
            heading: 0,
            range_meters,
            scan_number: index as u16,
            data,
        }
    }

    pub fn encode_into(&self, quantizer: &Quantizer, out: &mut Vec<u8>) -> Result<(), RadarError> {
        let packed = quantizer.pack(self.data.view())?;
        let header = GenBr24Header {
            header_len: RADAR_LINE_HEADER_LENGTH as u8,
            status: SPOKE_STATUS_VALID,
            scan_number: self.scan_number,
            angle: self.angle,
            heading: self.heading,
            range: range_to_native(self.range_meters),
            ..Default::default()
        };
        bincode::serialize_into(&mut *out, &header)?;
        out.extend_from_slice(&packed);
        Ok(())
    }

    pub fn encode(&self, quantizer: &Quantizer) -> Result<Vec<u8>, RadarError> {
        let mut out = Vec::with_capacity(RADAR_LINE_LENGTH);
        self.encode_into(quantizer, &mut out)?;
        Ok(out)
    }
}

/// A frame is an (all zero) frame header followed by a number of spokes
pub fn encode_frame<'a, I>(spokes: I, quantizer: &Quantizer) -> Result<Vec<u8>, RadarError>
where
    I: IntoIterator<Item = Spoke<'a>>,
{
    let spokes = spokes.into_iter();
    let mut frame =
        Vec::with_capacity(FRAME_HEADER_LENGTH + spokes.size_hint().0 * RADAR_LINE_LENGTH);
    frame.resize(FRAME_HEADER_LENGTH, 0);
    for spoke in spokes {
        spoke.encode_into(quantizer, &mut frame)?;
    }
    Ok(frame)
}

///
/// Sends the sweep, one frame of `batch` spokes each time it runs.
///
pub struct SpokeSender {
    key: String,
    sweep: SweepBuffer,
    quantizer: Quantizer,
    batch: usize,
    range_meters: u32,
    addr: SocketAddrV4,
    transport: Arc<dyn Transport>,
}

impl SpokeSender {
    pub fn new(
        sweep: SweepBuffer,
        batch: usize,
        range_meters: u32,
        addr: SocketAddrV4,
        transport: Arc<dyn Transport>,
    ) -> Self {
        SpokeSender {
            key: "spokes".to_owned(),
            sweep,
            quantizer: Quantizer::new(),
            batch,
            range_meters,
            addr,
            transport,
        }
    }

    fn next_frame(&mut self) -> Result<Vec<u8>, RadarError> {
        let spokes = self.sweep.spokes();
        let range_meters = self.range_meters;
        let batch = self
            .sweep
            .next_batch(self.batch)
            .map(|(index, data)| Spoke::new(index, spokes, range_meters, data));
        encode_frame(batch, &self.quantizer)
    }
}

#[async_trait]
impl PeriodicTask for SpokeSender {
    fn name(&self) -> &str {
        &self.key
    }

    async fn run(&mut self) -> Result<(), RadarError> {
        let first = self.sweep.cursor();
        let frame = self.next_frame()?;
        log::trace!(
            "{}: frame of {} spokes from {}, {} bytes",
            self.key,
            self.batch,
            first,
            frame.len()
        );
        send_packet(self.transport.as_ref(), &self.key, &frame, &self.addr).await;
        Ok(())
    }
}
