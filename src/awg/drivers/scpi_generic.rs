//! Driver for generators that speak a Siglent-compatible SCPI dialect
//! over a raw TCP/VISA-style socket (the `dg800` and `utg1000x` CLI
//! driver names): OWON DG800 and UNI-T UTG1000X both clone the
//! SDG `BSWV`/`OUTP` command set closely enough that each [`AwgDriver`]
//! call maps to one line sent over [`ScpiTcpProtocol`].
//!
//! Grounded on `protocol::scpi_tcp::ScpiTcpProtocol` and the
//! `dyn ScpiProtocol::send` helper it inherits from the teacher.

use async_trait::async_trait;

use crate::awg::{AwgDriver, OutputLoad, WaveformType};
use crate::error::Result;
use crate::protocol::{Protocol, ScpiProtocol, ScpiTcpProtocol};

pub struct ScpiGenericDriver {
    transport: ScpiTcpProtocol,
}
impl ScpiGenericDriver {
    pub fn new(addr: std::net::SocketAddr) -> Result<Self> {
        Ok(Self {
            transport: ScpiTcpProtocol::new(addr)?,
        })
    }

    async fn send(&mut self, line: String) -> Result<()> {
        (&mut self.transport as &mut dyn ScpiProtocol).send(line).await
    }
}

#[async_trait]
impl AwgDriver for ScpiGenericDriver {
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
        self.send(format!("C{channel}:OUTP LOAD,{value}")).await
    }

    async fn set_output_on(&mut self, channel: u8, enabled: bool) -> Result<()> {
        let value = if enabled { "ON" } else { "OFF" };
        self.send(format!("C{channel}:OUTP {value}")).await
    }

    async fn set_waveform_type(&mut self, channel: u8, waveform: WaveformType) -> Result<()> {
        self.send(format!("C{channel}:BSWV WVTP,{waveform}")).await
    }

    async fn set_frequency(&mut self, channel: u8, hertz: f64) -> Result<()> {
        self.send(format!("C{channel}:BSWV FRQ,{hertz}")).await
    }

    async fn set_amplitude(&mut self, channel: u8, volts_pp: f64) -> Result<()> {
        self.send(format!("C{channel}:BSWV AMP,{volts_pp}")).await
    }

    async fn set_offset(&mut self, channel: u8, volts: f64) -> Result<()> {
        self.send(format!("C{channel}:BSWV OFST,{volts}")).await
    }

    async fn set_phase(&mut self, channel: u8, degrees: f64) -> Result<()> {
        self.send(format!("C{channel}:BSWV PHSE,{degrees}")).await
    }
}
