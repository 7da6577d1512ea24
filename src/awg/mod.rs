//! The abstract interface the VXI-11/SCPI layer drives, and the
//! concrete drivers that translate it onto a real waveform generator.
//!
//! Grounded on the teacher's `equipment` module: one `#[async_trait]`
//! trait (there, `Psu`/`AcSource`/...; here, [`AwgDriver`]) plus one
//! file per vendor under `drivers/`, the same shape as
//! `equipment/drivers/*.rs`.

use async_trait::async_trait;
use strum_macros::{Display, EnumString};

use crate::error::Result;

pub mod drivers;

/// Waveform shape, as named by `BSWV WVTP,<name>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum WaveformType {
    #[default]
    Sine,
    Square,
    Ramp,
    Pulse,
    Noise,
    Dc,
    Arb,
}

/// Output termination, as named by `OUTP LOAD,<value>`. The wire value
/// for high-impedance is the literal token `HZ`, not a numeric load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputLoad {
    Fifty,
    #[default]
    HighZ,
}
impl OutputLoad {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "50" => Some(Self::Fifty),
            "HZ" => Some(Self::HighZ),
            _ => None,
        }
    }
}

/// A waveform generator this process can drive on the scope's behalf.
///
/// Every method is a one-way setter: the bridge never reads state back
/// out of a driver. Query replies (`BSWV?`) are answered entirely from
/// the core's own cached channel state, never by round-tripping the
/// physical instrument, so a slow or unresponsive generator never
/// stalls a Bode sweep's query traffic.
#[async_trait]
pub trait AwgDriver: Send + Sync {
    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Called once, the first time a channel is addressed, before any
    /// other per-channel call.
    async fn initialize_channel(&mut self, channel: u8) -> Result<()>;

    async fn set_output_load(&mut self, channel: u8, load: OutputLoad) -> Result<()>;

    async fn set_output_on(&mut self, channel: u8, enabled: bool) -> Result<()>;

    async fn set_waveform_type(&mut self, channel: u8, waveform: WaveformType) -> Result<()>;

    async fn set_frequency(&mut self, channel: u8, hertz: f64) -> Result<()>;

    async fn set_amplitude(&mut self, channel: u8, volts_pp: f64) -> Result<()>;

    async fn set_offset(&mut self, channel: u8, volts: f64) -> Result<()>;

    async fn set_phase(&mut self, channel: u8, degrees: f64) -> Result<()>;
}
