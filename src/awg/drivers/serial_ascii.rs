//! Driver for the cheap USB/UART function generators reachable only as
//! a serial device (`jds6600`, `fy`, `fy6600`, `bk4075`, `ad9910` CLI
//! driver names): no two of these actually share a byte-for-byte
//! command set, so this speaks the smallest common ASCII subset
//! (`CHn <KEYWORD> <value>\r\n`) rather than one true vendor protocol.
//! Swapping in the exact dialect for a given board is a matter of
//! overriding [`Self::send`]'s formatting, not the surrounding
//! [`AwgDriver`] wiring.
//!
//! Grounded on `protocol::scpi_serial::ScpiSerialProtocol`.

use async_trait::async_trait;

use crate::awg::{AwgDriver, OutputLoad, WaveformType};
use crate::error::Result;
use crate::protocol::{Protocol, ScpiProtocol, ScpiSerialProtocol};

pub struct SerialAsciiDriver {
    transport: ScpiSerialProtocol,
}
impl SerialAsciiDriver {
    pub fn new(port: &str, baud: u32) -> Self {
        Self {
            transport: ScpiSerialProtocol::new(port, baud),
        }
    }

    async fn send(&mut self, line: String) -> Result<()> {
        (&mut self.transport as &mut dyn ScpiProtocol).send(line).await
    }
}

#[async_trait]
impl AwgDriver for SerialAsciiDriver {
    async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }

    async fn initialize_channel(&mut self, _channel: u8) -> Result<()> {
        Ok(())
    }

    async fn set_output_load(&mut self, channel: u8, load: OutputLoad) -> Result<()> {
        let value = match load {
            OutputLoad::Fifty => "50",
            OutputLoad::HighZ => "HZ",
        };
        self.send(format!("CH{channel} LOAD {value}")).await
    }

    async fn set_output_on(&mut self, channel: u8, enabled: bool) -> Result<()> {
        let value = if enabled { "ON" } else { "OFF" };
        self.send(format!("CH{channel} OUT {value}")).await
    }

    async fn set_waveform_type(&mut self, channel: u8, waveform: WaveformType) -> Result<()> {
        self.send(format!("CH{channel} WAVE {waveform}")).await
    }

    async fn set_frequency(&mut self, channel: u8, hertz: f64) -> Result<()> {
        self.send(format!("CH{channel} FREQ {hertz}")).await
    }

    async fn set_amplitude(&mut self, channel: u8, volts_pp: f64) -> Result<()> {
        self.send(format!("CH{channel} AMPL {volts_pp}")).await
    }

    async fn set_offset(&mut self, channel: u8, volts: f64) -> Result<()> {
        self.send(format!("CH{channel} OFFS {volts}")).await
    }

    async fn set_phase(&mut self, channel: u8, degrees: f64) -> Result<()> {
        self.send(format!("CH{channel} PHAS {degrees}")).await
    }
}
